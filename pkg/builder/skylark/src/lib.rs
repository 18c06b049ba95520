#![feature(unsize, unsized_tuple_coercion)]

#[macro_use]
extern crate common;
#[macro_use]
extern crate parsing;
extern crate crypto;
extern crate protobuf;

mod dict;
mod environment;
mod function;
mod list;
mod object;
mod primitives;
mod proto;
mod scope;
pub mod syntax;
mod tuple;
mod value;

pub use dict::*;
pub use environment::*;
pub use function::*;
pub use list::*;
pub use object::*;
pub use primitives::*;
pub use proto::*;
pub use scope::*;
pub use tuple::*;
pub use value::*;
