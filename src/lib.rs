mod calibration;
mod cloud;
mod config;
mod correction;
mod decoder;
mod gate;
mod packet;
mod scan;
mod throttle;
mod transform;
mod trig;

pub use calibration::*;
pub use cloud::*;
pub use config::*;
pub use correction::*;
pub use decoder::*;
pub use gate::*;
pub use packet::*;
pub use scan::*;
pub use transform::*;
pub use trig::*;
