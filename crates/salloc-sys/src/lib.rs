pub mod extent;
pub mod math;
pub mod prim;
pub mod system;
pub mod unix;

pub use system::GLOBAL_SYSTEM;

pub mod prelude {
  pub use super::{
    GLOBAL_SYSTEM,
    extent::{
      Extent,
      ExtentError,
      ExtentResult,
    },
    math::{
      align_down,
      align_up,
      is_aligned,
    },
    prim::{
      min_align,
      page_align,
      page_size,
      word_width,
    },
    system::{
      HEAP_SYSTEM,
      HeapSystem,
      PAGE_SYSTEM,
      PageSystem,
      SysError,
      SysResult,
      System,
    },
  };
}
