use std::error::Error;
use std::fmt;

/// InputValueError is used if some race option or parameter does not fulfill the posed
/// requirements, e.g., by setting an incremental countdown start above the countdown length.
#[derive(Debug, Clone)]
pub struct InputValueError;

impl fmt::Display for InputValueError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid input value")
    }
}

impl Error for InputValueError {}

/// count_duplicates returns the number of items in x that are equal to an earlier item.
pub fn count_duplicates<T: PartialEq>(x: &[T]) -> usize {
    x.iter()
        .enumerate()
        .filter(|(i, val)| x[..*i].contains(val))
        .count()
}
