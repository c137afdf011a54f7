//! SIMD-accelerated kernels for VSA operations.
//!
//! This module provides a `VsaKernel` trait with CPU-specific implementations.
//! At runtime, [`detect_isa`] determines the best available instruction set and
//! [`best_kernel`] returns the fastest implementation for the current CPU.
//!
//! # Supported ISA levels
//!
//! - **Generic**: Pure-Rust scalar fallback — works everywhere (illumos, ARM, etc.)
//! - **AVX2**: 256-bit SIMD for x86_64 Linux/illumos systems with AVX2 support

pub mod avx2;
pub mod generic;

/// Instruction set architecture level detected at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IsaLevel {
    /// Pure-Rust scalar operations, no SIMD.
    Generic,
    /// x86_64 AVX2 (256-bit vectors).
    Avx2,
}

impl std::fmt::Display for IsaLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IsaLevel::Generic => write!(f, "Generic (scalar)"),
            IsaLevel::Avx2 => write!(f, "AVX2 (256-bit)"),
        }
    }
}

/// Detect the best ISA level available on the current CPU.
pub fn detect_isa() -> IsaLevel {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            return IsaLevel::Avx2;
        }
    }
    IsaLevel::Generic
}

/// Trait for SIMD-accelerated VSA kernels.
///
/// Each method operates on raw byte/i8 slices representing hypervectors.
/// Implementations must handle alignment and length requirements internally.
pub trait VsaKernel: Send + Sync {
    /// The ISA level this kernel targets.
    fn isa_level(&self) -> IsaLevel;

    /// XOR-bind two binary hypervectors (byte-wise XOR).
    ///
    /// `a` and `b` must have the same length.
    /// Writes result into `out`.
    fn xor_bind(&self, a: &[u8], b: &[u8], out: &mut [u8]);

    /// Bundle (element-wise addition) of `i8` hypervectors.
    ///
    /// Adds `src` element-wise into `acc` (accumulator), saturating at i8 bounds.
    fn bundle_add_i8(&self, acc: &mut [i8], src: &[i8]);

    /// Compute Hamming distance between two binary hypervectors.
    fn hamming_distance(&self, a: &[u8], b: &[u8]) -> u32;

    /// Cosine similarity between two `i8` hypervectors.
    ///
    /// Returns a value in `[-1.0, 1.0]`.
    fn cosine_similarity_i8(&self, a: &[i8], b: &[i8]) -> f32;

    /// Permute a binary hypervector by `shift` positions (circular left shift).
    fn permute(&self, data: &[u8], shift: usize, out: &mut [u8]);
}

/// Return the best available kernel for the current CPU.
pub fn best_kernel() -> Box<dyn VsaKernel> {
    match detect_isa() {
        #[cfg(target_arch = "x86_64")]
        IsaLevel::Avx2 => Box::new(avx2::Avx2Kernel),
        _ => Box::new(generic::GenericKernel),
    }
}
