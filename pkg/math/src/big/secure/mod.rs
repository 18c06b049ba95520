mod modulo;
mod montgomery;
mod uint;

pub use self::modulo::*;
pub use self::montgomery::*;
pub use self::uint::*;
