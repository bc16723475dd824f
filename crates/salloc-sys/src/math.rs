pub const fn is_aligned(value: usize, align: usize) -> Option<bool> {
  if !align.is_power_of_two() {
    return None;
  }
  Some((value & (align - 1)) == 0)
}

pub const fn align_up(value: usize, align: usize) -> Option<usize> {
  if !align.is_power_of_two() {
    return None;
  }

  let mask = align - 1;
  if let Some(sum) = value.checked_add(mask) {
    return Some(sum & !mask);
  }

  None
}

pub const fn align_down(value: usize, align: usize) -> Option<usize> {
  if !align.is_power_of_two() {
    return None;
  }

  Some(value & !(align - 1))
}

/// `value + value / 2`, the growth step shared by every growable structure.
pub const fn grow_half(value: usize) -> Option<usize> {
  value.checked_add(value / 2)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn aligned_checks() {
    assert_eq!(is_aligned(0, 8), Some(true));
    assert_eq!(is_aligned(24, 8), Some(true));
    assert_eq!(is_aligned(24, 16), Some(false));
    assert_eq!(is_aligned(17, 1), Some(true));
    assert_eq!(is_aligned(64, 3), None);
  }

  #[test]
  fn align_up_rounds_to_boundary() {
    assert_eq!(align_up(0, 16), Some(0));
    assert_eq!(align_up(1, 16), Some(16));
    assert_eq!(align_up(16, 16), Some(16));
    assert_eq!(align_up(17, 16), Some(32));
    assert_eq!(align_up(4097, 4096), Some(8192));
    assert_eq!(align_up(10, 6), None);
    assert_eq!(align_up(usize::MAX, 8), None);
  }

  #[test]
  fn align_down_truncates() {
    assert_eq!(align_down(15, 8), Some(8));
    assert_eq!(align_down(8191, 4096), Some(4096));
    assert_eq!(align_down(7, 5), None);
  }

  #[test]
  fn grow_half_steps() {
    assert_eq!(grow_half(64), Some(96));
    assert_eq!(grow_half(16 * 1024), Some(24 * 1024));
    assert_eq!(grow_half(1), Some(1));
    assert_eq!(grow_half(usize::MAX), None);
  }
}
