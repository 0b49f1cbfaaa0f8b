//! Tri-state configuration values.

/// A configuration value that is either left unspecified or set explicitly.
///
/// Unlike a sentinel zero, `Specified(0)` and `Unspecified` stay distinct
/// through storage. Reading an unspecified value yields `T::default()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setting<T> {
    Unspecified,
    Specified(T),
}

impl<T> Default for Setting<T> {
    fn default() -> Self {
        Setting::Unspecified
    }
}

impl<T> Setting<T> {
    pub fn is_unspecified(&self) -> bool {
        matches!(self, Setting::Unspecified)
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Setting::Unspecified => None,
            Setting::Specified(v) => Some(v),
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Setting::Unspecified => None,
            Setting::Specified(v) => Some(v),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Setting<U> {
        match self {
            Setting::Unspecified => Setting::Unspecified,
            Setting::Specified(v) => Setting::Specified(f(v)),
        }
    }
}

impl<T: Clone + Default> Setting<T> {
    /// The explicit value, or the type's zero-equivalent when unspecified.
    pub fn get(&self) -> T {
        self.as_option().cloned().unwrap_or_default()
    }
}

impl<T> From<Option<T>> for Setting<T> {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => Setting::Specified(v),
            None => Setting::Unspecified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unspecified_reads_as_zero() {
        let timer: Setting<u32> = Setting::Unspecified;
        assert!(timer.is_unspecified());
        assert_eq!(timer.get(), 0);
    }

    #[test]
    fn test_explicit_zero_is_specified() {
        let timer = Setting::Specified(0u32);
        assert!(!timer.is_unspecified());
        assert_eq!(timer.get(), 0);
        assert_ne!(timer, Setting::Unspecified);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Setting::from(Some(0.5f64)), Setting::Specified(0.5));
        assert_eq!(Setting::<f64>::from(None), Setting::Unspecified);
        assert_eq!(Setting::Specified(3u32).map(|v| v * 2).into_option(), Some(6));
    }
}
