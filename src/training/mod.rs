//! Teacher-forced training: the forcing policy and the batched loss
//! driver.

pub mod supervised;
pub mod teacher;
