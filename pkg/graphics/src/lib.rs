#[macro_use]
extern crate common;
extern crate gl;
extern crate glfw;
extern crate image;
extern crate math;
// TODO: Ensure that this uses a common gl librry.
extern crate minifb;
extern crate parsing;
extern crate typenum;
#[macro_use]
extern crate macros;
extern crate reflection;

pub mod app;
pub mod drawable;
pub mod font;
pub mod group;
pub mod lighting;
pub mod mesh;
pub mod patch;
pub mod polygon;
pub mod raster;
pub mod shader;
pub mod transform;
pub mod transforms;
pub mod util;
pub mod window;
