#![allow(dead_code)]

use std::thread;
use std::time::Duration;

use rand::Rng;
use rp_engine::{Dims, EngineConfig};
use rp_matrix::{ComputeBackend, CpuBackend, Element, Generator, Matrix, Result};

/// CPU backend that sleeps a random amount before every product, so workers
/// finish in an unpredictable order.
#[derive(Debug, Clone)]
pub struct JitterBackend {
    pub max_delay: Duration,
}

impl JitterBackend {
    pub fn new(max_delay: Duration) -> Self {
        JitterBackend { max_delay }
    }
}

impl ComputeBackend for JitterBackend {
    fn matmul<T: Element>(&self, a: &[T], b: &[T], m: usize, k: usize, n: usize) -> Result<Vec<T>> {
        let micros = self.max_delay.as_micros() as u64;
        if micros > 0 {
            let delay = rand::thread_rng().gen_range(0..=micros);
            thread::sleep(Duration::from_micros(delay));
        }
        CpuBackend::new().matmul(a, b, m, k, n)
    }
}

/// The operands a coordinator generates for `config`, and their product.
pub fn reference<T: Element>(dims: Dims, config: &EngineConfig) -> (Matrix<T>, Matrix<T>, Matrix<T>) {
    let mut generator = Generator::new(config.seed);
    let a = generator.generate::<T>(dims.m, dims.k, config.kind).unwrap();
    let b = generator.generate::<T>(dims.k, dims.n, config.kind).unwrap();
    let c = a.matmul(&b, &CpuBackend::new()).unwrap();
    (a, b, c)
}
