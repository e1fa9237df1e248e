/// Rounds `value` up to the next multiple of `to`, which must be a power of two.
///
/// # Examples
///
/// ```rust
/// use rcollector::align;
///
/// assert_eq!(align!(13, 8), 16);
/// assert_eq!(align!(4096, 4096), 4096);
/// assert_eq!(align!(4097, 4096), 8192);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr, $to:expr) => {
    ($value + $to - 1) & !($to - 1)
  };
}
