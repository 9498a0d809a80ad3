//! Centralized storage for the WGSL kernel sources used by the benchmark
//! runners.

/// SparseCCL over the flattened layout, one invocation per module.
pub const SPARSE_CCL: &str = include_str!("kernels/sparse_ccl.wgsl");

/// Entry point of [`SPARSE_CCL`].
pub const SPARSE_CCL_ENTRY_POINT: &str = "sparse_ccl";

/// Must match `@workgroup_size` in the kernel source.
pub const WORKGROUP_SIZE: u32 = 64;

#[cfg(test)]
mod tests {
    use super::*;
    use naga::valid::{Capabilities, ValidationFlags, Validator};

    fn validate_wgsl(label: &str, source: &str) {
        let module =
            naga::front::wgsl::parse_str(source).unwrap_or_else(|err| panic!("{label}: {err:?}"));
        let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
        validator
            .validate(&module)
            .unwrap_or_else(|err| panic!("{label}: {err:?}"));
    }

    #[test]
    fn sparse_ccl_validates() {
        validate_wgsl("sparse_ccl", SPARSE_CCL);
    }

    #[test]
    fn sparse_ccl_declares_the_expected_entry_point() {
        assert!(SPARSE_CCL.contains(&format!("fn {SPARSE_CCL_ENTRY_POINT}(")));
        assert!(SPARSE_CCL.contains(&format!("@workgroup_size({WORKGROUP_SIZE})")));
    }
}
