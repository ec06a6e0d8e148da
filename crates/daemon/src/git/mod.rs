// Git side of the push cycle: process-level worker and the ordered step list.

pub mod sequence;
pub mod worker;
