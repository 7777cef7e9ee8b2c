//! Processor capability probe
//!
//! The probe runs once per process; afterwards every query reads the same
//! immutable snapshot.

use bitflags::bitflags;
use lazy_static::lazy_static;

bitflags! {
    /// Instruction set extensions relevant to executor selection
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CpuFeatures: u32 {
        /// 64-bit MMX integer registers
        const MMX = 0b00000001;
        /// Streaming SIMD extensions
        const SSE = 0b00000010;
        /// 128-bit integer SIMD
        const SSE2 = 0b00000100;
        /// 256-bit floating point SIMD
        const AVX = 0b00001000;
        /// 256-bit integer SIMD (required by the vector executor)
        const AVX2 = 0b00010000;
    }
}

lazy_static! {
    static ref CPU_FEATURES: CpuFeatures = CpuFeatures::detect();
}

impl CpuFeatures {
    /// Query the running processor
    ///
    /// Prefer [`cpu_features`], which caches the result.
    #[cfg(target_arch = "x86_64")]
    pub fn detect() -> Self {
        use std::arch::x86_64::__cpuid;

        let mut features = CpuFeatures::empty();

        // Safety: CPUID leaf 1 exists on every x86_64 processor.
        #[allow(unused_unsafe)]
        let leaf = unsafe { __cpuid(1) };
        if leaf.edx & (1 << 23) != 0 {
            features |= CpuFeatures::MMX;
        }
        if leaf.edx & (1 << 25) != 0 {
            features |= CpuFeatures::SSE;
        }

        if is_x86_feature_detected!("sse2") {
            features |= CpuFeatures::SSE2;
        }
        if is_x86_feature_detected!("avx") {
            features |= CpuFeatures::AVX;
        }
        if is_x86_feature_detected!("avx2") {
            features |= CpuFeatures::AVX2;
        }
        features
    }

    /// Query the running processor
    #[cfg(not(target_arch = "x86_64"))]
    pub fn detect() -> Self {
        CpuFeatures::empty()
    }
}

/// Process-wide capability snapshot
pub fn cpu_features() -> CpuFeatures {
    *CPU_FEATURES
}

/// Check if AVX2 is available on this CPU
pub fn is_avx2_supported() -> bool {
    cpu_features().contains(CpuFeatures::AVX2)
}

/// Check if SSE is available on this CPU
pub fn is_sse_supported() -> bool {
    cpu_features().contains(CpuFeatures::SSE)
}

/// Check if MMX is available on this CPU
pub fn is_mmx_supported() -> bool {
    cpu_features().contains(CpuFeatures::MMX)
}
