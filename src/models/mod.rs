pub mod matrix;
pub mod codec;
pub mod likelihood;
pub mod temperature;
pub mod bias;

pub use bias::estimate_bias;
pub use matrix::ClassMatrix;
pub use temperature::{fit_temperature, TemperatureFit};
