//! Level-order decoding: the queue/state arenas shared by both drivers
//! and the greedy inference driver.

pub mod greedy;
pub mod queue;
