/// Check whether an acquisition message should be suppressed.
///
/// When `acquired_info` is the vendor sentinel only `vendor_list` is
/// consulted (by `vendor_code`); otherwise only `standard_list` is. A code
/// that appears in the vendor list but arrives as a standard code is not
/// filtered.
#[must_use]
pub fn is_ignored(
    acquired_info: i32,
    vendor_code: i32,
    vendor_sentinel: i32,
    standard_list: &[i32],
    vendor_list: &[i32],
) -> bool {
    if acquired_info == vendor_sentinel {
        vendor_list.contains(&vendor_code)
    } else {
        standard_list.contains(&acquired_info)
    }
}

/// Ignore lists for one session variant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcquireFilter {
    vendor_sentinel: i32,
    standard: Vec<i32>,
    vendor: Vec<i32>,
}

impl AcquireFilter {
    /// Filter that ignores nothing
    #[must_use]
    pub const fn new(vendor_sentinel: i32) -> Self {
        Self {
            vendor_sentinel,
            standard: Vec::new(),
            vendor: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_lists(vendor_sentinel: i32, standard: Vec<i32>, vendor: Vec<i32>) -> Self {
        Self {
            vendor_sentinel,
            standard,
            vendor,
        }
    }

    #[must_use]
    pub fn standard_list(&self) -> &[i32] {
        &self.standard
    }

    #[must_use]
    pub fn vendor_list(&self) -> &[i32] {
        &self.vendor
    }

    #[must_use]
    pub fn should_ignore(&self, acquired_info: i32, vendor_code: i32) -> bool {
        is_ignored(
            acquired_info,
            vendor_code,
            self.vendor_sentinel,
            &self.standard,
            &self.vendor,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VENDOR: i32 = 6;

    #[test]
    fn test_empty_lists_ignore_nothing() {
        let filter = AcquireFilter::new(VENDOR);
        assert!(!filter.should_ignore(0, 0));
        assert!(!filter.should_ignore(VENDOR, 55));
    }

    #[test]
    fn test_standard_and_vendor_lists() {
        let filter = AcquireFilter::with_lists(VENDOR, vec![10], vec![55]);
        assert!(filter.should_ignore(10, 12345));
        assert!(filter.should_ignore(VENDOR, 55));
        assert!(!filter.should_ignore(7, 99));
        assert!(!filter.should_ignore(VENDOR, 56));
    }

    #[test]
    fn test_vendor_list_not_consulted_for_standard_codes() {
        // 55 is in the vendor list but arrives as a standard code
        assert!(!is_ignored(55, 0, VENDOR, &[], &[55]));
        // 10 is in the standard list but arrives behind the vendor sentinel
        assert!(!is_ignored(VENDOR, 10, VENDOR, &[10], &[]));
    }
}
