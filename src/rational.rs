/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Best rational approximation with bounded numerator and denominator

use crate::constants::PPM;

/// Finds `b/c` closest to `numerator/denominator` with `b <= max_numerator`
/// and `c <= max_denominator`.
///
/// Walks the continued fraction expansion of the input. When the next
/// convergent would break one of the bounds, the largest semi-convergent
/// that still fits is compared against the previous convergent and the
/// closer of the two is returned.
pub fn best_approximation(
    numerator: u32,
    denominator: u32,
    max_numerator: u32,
    max_denominator: u32,
) -> (u32, u32) {
    let (mut n, mut d) = (numerator as u64, denominator as u64);
    let (max_n, max_d) = (max_numerator as u64, max_denominator as u64);

    // n0/d0 and n1/d1 are the two latest convergents, seeded with 0/1 and 1/0
    let (mut n0, mut d0) = (0u64, 1u64);
    let (mut n1, mut d1) = (1u64, 0u64);

    while d != 0 {
        let dp = d;
        let a = n / d;
        d = n % d;
        n = dp;

        let n2 = n0 + a * n1;
        let d2 = d0 + a * d1;

        if n2 > max_n || d2 > max_d {
            let mut t = u64::MAX;
            if d1 != 0 {
                t = (max_d - d0) / d1;
            }
            if n1 != 0 {
                t = t.min((max_n - n0) / n1);
            }

            // semi-convergent n0 + t*n1 beats n1/d1 only for t >= a/2
            if d1 == 0 || 2 * t > a || (2 * t == a && d0 * dp > d1 * d) {
                n1 = n0 + t * n1;
                d1 = d0 + t * d1;
            }
            break;
        }

        n0 = n1;
        n1 = n2;
        d0 = d1;
        d1 = d2;
    }

    (n1 as u32, d1 as u32)
}

/// Approximates a fractional remainder given in parts-per-million.
///
/// A zero remainder short-circuits to `(0, 1)`.
pub fn approximate_ppm(ppm: u32, max_numerator: u32, max_denominator: u32) -> (u32, u32) {
    if ppm == 0 {
        return (0, 1);
    }
    best_approximation(ppm, PPM, max_numerator, max_denominator)
}
