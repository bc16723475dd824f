mod fixed;

pub use fixed::{
  Fixed,
  FixedError,
  FixedResult,
};
