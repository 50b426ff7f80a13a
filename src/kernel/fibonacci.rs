use crate::error::KernelError;
use crate::kernel::Kernel;

/// Largest input whose Fibonacci number fits in a `u64`.
pub const MAX_INPUT: u64 = 93;

#[derive(Debug, Default, Clone, Copy)]
pub struct Fibonacci;

impl Kernel for Fibonacci {
    fn span_name(&self) -> &'static str {
        "process"
    }

    fn run(&self, input: u64) -> Result<u64, KernelError> {
        if input > MAX_INPUT {
            return Err(KernelError::Unsupported { input });
        }
        let (mut a, mut b) = (0u64, 1u64);
        for _ in 0..input {
            // b runs one step ahead and may wrap on the final step
            (a, b) = (b, a.wrapping_add(b));
        }
        Ok(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_values() {
        let fib = Fibonacci;
        let values: Vec<u64> = (0..10).map(|n| fib.run(n).unwrap()).collect();
        assert_eq!(values, vec![0, 1, 1, 2, 3, 5, 8, 13, 21, 34]);
    }

    #[test]
    fn test_largest_supported_input() {
        assert_eq!(Fibonacci.run(MAX_INPUT).unwrap(), 12_200_160_415_121_876_738);
    }

    #[test]
    fn test_too_large_is_unsupported() {
        let err = Fibonacci.run(94).unwrap_err();
        assert_eq!(err, KernelError::Unsupported { input: 94 });
        assert_eq!(err.to_string(), "unsupported fibonacci number 94: too large");
    }
}
