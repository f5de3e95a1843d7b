pub mod column;
pub mod normalize;
pub mod resample;
pub mod source;
