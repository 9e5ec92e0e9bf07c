pub mod algebra;
pub mod bounds;
pub mod constraint;
pub mod dbm;
pub mod delay;
pub mod extrapolation;
pub mod resize;
pub mod update;

#[cfg(test)]
pub(crate) mod sample;
