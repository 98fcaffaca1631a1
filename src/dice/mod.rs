//! Dice & probability primitives: D6 success rates, rerolls, dice expressions,
//! binomial and convolution helpers used by the damage calculator.

use serde::{Deserialize, Serialize};

/// Faces on the only die the cascade rolls.
pub const D6_FACES: u32 = 6;

/// Average used when a dice expression cannot be parsed.
pub const FALLBACK_AVERAGE: f64 = 1.0;

/// Which failed dice may be rerolled at a stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RerollPolicy {
    #[default]
    None,
    Ones,
    All,
}

impl RerollPolicy {
    /// The more generous of two policies.
    pub fn stronger(self, other: RerollPolicy) -> RerollPolicy {
        self.max(other)
    }

    /// Fraction of first rolls that get a second attempt, given the success rate `p`.
    /// Threshold is clamped to 2+ so a natural 1 is always a failure.
    pub fn rerolled_mass(self, p: f64) -> f64 {
        match self {
            RerollPolicy::None => 0.0,
            RerollPolicy::Ones => 1.0 / D6_FACES as f64,
            RerollPolicy::All => 1.0 - p,
        }
    }
}

/// Chance a single D6 meets `threshold`+. A 1 always fails and a 6 always succeeds.
pub fn roll_probability(threshold: i32) -> f64 {
    let t = threshold.clamp(2, 6);
    (7 - t) as f64 / D6_FACES as f64
}

/// Chance a save roll meets `threshold`+. Saves worse than 6+ cannot be passed.
pub fn save_probability(threshold: i32) -> f64 {
    if threshold > 6 {
        return 0.0;
    }
    roll_probability(threshold)
}

/// Success rate `p` after applying a reroll policy analytically.
pub fn with_reroll(p: f64, policy: RerollPolicy) -> f64 {
    let p = p.clamp(0.0, 1.0);
    (p + policy.rerolled_mass(p) * p).clamp(0.0, 1.0)
}

/// Parse a roll threshold written as "3+", "3" or " 4+ ".
pub fn parse_threshold(s: &str) -> Option<u8> {
    let t = s.trim().trim_end_matches('+').trim();
    t.parse::<u8>().ok().filter(|n| (1..=7).contains(n))
}

/// A dice expression of the form `[count]D<sides>[+/-modifier]` or a flat number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpr {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl DiceExpr {
    pub fn flat(value: i32) -> Self {
        DiceExpr {
            count: 0,
            sides: 0,
            modifier: value,
        }
    }

    /// Parse "D6", "2D3+1", "d6-1" or "4". Returns None on anything else.
    pub fn parse(s: &str) -> Option<Self> {
        let s: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();
        if s.is_empty() {
            return None;
        }
        if let Ok(n) = s.parse::<i32>() {
            return Some(DiceExpr::flat(n));
        }
        let (count_part, rest) = s.split_once('D')?;
        let count = if count_part.is_empty() {
            1
        } else {
            count_part.parse::<u32>().ok()?
        };
        let (sides_part, modifier) = match rest.find(['+', '-']) {
            Some(i) => {
                let m = rest[i..].parse::<i32>().ok()?;
                (&rest[..i], m)
            }
            None => (rest, 0),
        };
        let sides = sides_part.parse::<u32>().ok()?;
        if sides < 2 || count == 0 || count > 20 {
            return None;
        }
        Some(DiceExpr {
            count,
            sides,
            modifier,
        })
    }

    pub fn average(&self) -> f64 {
        let dice = self.count as f64 * (self.sides as f64 + 1.0) / 2.0;
        (dice + self.modifier as f64).max(0.0)
    }

    /// Exact probability mass function, indexed by result. Results below zero
    /// count as zero; mass at or beyond `cap` is folded into index `cap`.
    pub fn distribution(&self, cap: usize) -> Vec<f64> {
        let mut pmf = vec![1.0];
        if self.sides > 0 {
            let die = die_pmf(self.sides, cap);
            for _ in 0..self.count {
                pmf = convolve(&pmf, &die, cap);
            }
        }
        shift(&pmf, self.modifier, cap)
    }
}

/// One die with `sides` faces, truncated at `cap`.
fn die_pmf(sides: u32, cap: usize) -> Vec<f64> {
    let face = 1.0 / sides as f64;
    let sides = sides as usize;
    if sides <= cap {
        let mut die = vec![face; sides + 1];
        die[0] = 0.0;
        return die;
    }
    let mut die = vec![face; cap + 1];
    die[0] = 0.0;
    die[cap] = (sides - cap + 1) as f64 * face;
    die
}

fn shift(pmf: &[f64], by: i32, cap: usize) -> Vec<f64> {
    if by >= 0 {
        let pad = (by as usize).min(cap);
        let mut out = vec![0.0; pad];
        out.extend_from_slice(pmf);
        return fold_at(out, cap);
    }
    let cut = by.unsigned_abs() as usize;
    let mut out = vec![pmf.iter().take(cut + 1).sum::<f64>()];
    out.extend(pmf.iter().skip(cut + 1).copied());
    fold_at(out, cap)
}

fn fold_at(mut pmf: Vec<f64>, cap: usize) -> Vec<f64> {
    if pmf.len() > cap.saturating_add(1) {
        let tail: f64 = pmf[cap..].iter().sum();
        pmf.truncate(cap + 1);
        pmf[cap] = tail;
    }
    pmf
}

/// Parse a dice expression, falling back to a flat 1 on unparseable text.
pub fn parse_or_fallback(expr: &str) -> DiceExpr {
    DiceExpr::parse(expr).unwrap_or_else(|| {
        tracing::debug!(expr, "unparseable dice expression, using fallback average");
        DiceExpr::flat(FALLBACK_AVERAGE as i32)
    })
}

/// Average of a dice expression; unparseable text falls back to 1.
pub fn dice_average(expr: &str) -> f64 {
    parse_or_fallback(expr).average()
}

/// Distribution of a dice expression truncated at `cap`; unparseable text is a certain 1.
pub fn dice_distribution(expr: &str, cap: usize) -> Vec<f64> {
    parse_or_fallback(expr).distribution(cap)
}

/// Binomial mass function for `n` trials at success rate `p`, indexed by success count.
pub fn binomial_pmf(n: usize, p: f64) -> Vec<f64> {
    let p = p.clamp(0.0, 1.0);
    let mut pmf = vec![0.0; n + 1];
    pmf[0] = 1.0;
    // Recurrence over trials keeps every coefficient in [0, 1].
    for trial in 1..=n {
        for k in (1..=trial).rev() {
            pmf[k] = pmf[k] * (1.0 - p) + pmf[k - 1] * p;
        }
        pmf[0] *= 1.0 - p;
    }
    pmf
}

/// Discrete convolution of two mass functions. Mass at or beyond `cap` is folded into index `cap`.
pub fn convolve(a: &[f64], b: &[f64], cap: usize) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return vec![1.0];
    }
    let full = a.len() + b.len() - 1;
    let len = full.min(cap.saturating_add(1));
    let mut out = vec![0.0; len];
    for (i, &pa) in a.iter().enumerate() {
        if pa == 0.0 {
            continue;
        }
        for (j, &pb) in b.iter().enumerate() {
            let k = (i + j).min(len - 1);
            out[k] += pa * pb;
        }
    }
    out
}

/// Mass function of `n` independent copies of `pmf` summed, truncated at `cap`.
pub fn convolve_power(pmf: &[f64], n: usize, cap: usize) -> Vec<f64> {
    let mut result = vec![1.0];
    let mut base = pmf.to_vec();
    let mut n = n;
    while n > 0 {
        if n & 1 == 1 {
            result = convolve(&result, &base, cap);
        }
        n >>= 1;
        if n > 0 {
            base = convolve(&base, &base, cap);
        }
    }
    result
}

/// Weighted sum of mass functions of possibly different lengths.
pub fn mix(parts: &[(f64, &[f64])]) -> Vec<f64> {
    let len = parts.iter().map(|(_, p)| p.len()).max().unwrap_or(1);
    let mut out = vec![0.0; len];
    for (w, pmf) in parts {
        for (i, p) in pmf.iter().enumerate() {
            out[i] += w * p;
        }
    }
    out
}

pub fn mean(pmf: &[f64]) -> f64 {
    pmf.iter().enumerate().map(|(i, p)| i as f64 * p).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn roll_probability_clamps() {
        assert!(close(roll_probability(3), 4.0 / 6.0));
        assert!(close(roll_probability(1), 5.0 / 6.0));
        assert!(close(roll_probability(9), 1.0 / 6.0));
        assert!(close(save_probability(7), 0.0));
        assert!(close(save_probability(4), 0.5));
    }

    #[test]
    fn reroll_policies() {
        let p = 0.5;
        assert!(close(with_reroll(p, RerollPolicy::None), 0.5));
        assert!(close(with_reroll(p, RerollPolicy::Ones), 0.5 + 0.5 / 6.0));
        assert!(close(with_reroll(p, RerollPolicy::All), 0.75));
        assert_eq!(
            RerollPolicy::Ones.stronger(RerollPolicy::All),
            RerollPolicy::All
        );
    }

    #[test]
    fn dice_average_forms() {
        assert!(close(dice_average("D6"), 3.5));
        assert!(close(dice_average("2D6"), 7.0));
        assert!(close(dice_average("D3+1"), 3.0));
        assert!(close(dice_average("d6 - 1"), 2.5));
        assert!(close(dice_average("4"), 4.0));
        assert!(close(dice_average("melee"), 1.0));
        assert!(close(dice_average(""), 1.0));
    }

    #[test]
    fn dice_distribution_matches_average() {
        for expr in ["D3", "2D6", "D6+2", "D3-1", "3"] {
            let pmf = dice_distribution(expr, usize::MAX);
            assert!(close(pmf.iter().sum::<f64>(), 1.0), "{expr}");
            assert!(close(mean(&pmf), dice_average(expr)), "{expr}");
        }
    }

    #[test]
    fn huge_dice_fold_into_cap() {
        let pmf = dice_distribution("2D200000", 10);
        assert_eq!(pmf.len(), 11);
        assert!(close(pmf.iter().sum::<f64>(), 1.0));
        assert!(pmf[10] > 0.999);

        let pmf = dice_distribution("D3000000000", 4);
        assert_eq!(pmf.len(), 5);
        assert!(close(pmf[4], 1.0 - 3.0 / 3_000_000_000.0));

        let flat = DiceExpr::flat(i32::MAX).distribution(6);
        assert_eq!(flat, vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn binomial_sums_to_one() {
        let pmf = binomial_pmf(10, 0.3);
        assert!(close(pmf.iter().sum::<f64>(), 1.0));
        assert!(close(mean(&pmf), 3.0));
    }

    #[test]
    fn convolve_folds_overflow_into_cap() {
        let coin = [0.5, 0.5];
        let out = convolve_power(&coin, 4, 2);
        assert_eq!(out.len(), 3);
        assert!(close(out[0], 1.0 / 16.0));
        assert!(close(out[1], 4.0 / 16.0));
        assert!(close(out[2], 11.0 / 16.0));
    }

    #[test]
    fn thresholds() {
        assert_eq!(parse_threshold("4+"), Some(4));
        assert_eq!(parse_threshold(" 2 "), Some(2));
        assert_eq!(parse_threshold("x"), None);
    }
}
