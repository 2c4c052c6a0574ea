#![allow(dead_code)]

pub const ADELE: &str = "Adele";
pub const SIA: &str = "Sia";
pub const ED_SHEERAN: &str = "Ed Sheeran";

pub const USER_ALICE: &str = "alice";
pub const USER_BOB: &str = "bob";
pub const USER_CAROL: &str = "carol";
