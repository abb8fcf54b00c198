//! Fairness proxies
//!
//! Differentiable statistics of the group attribute `z` and the post-effort
//! scores `yhat` that approximate the disparity in improvability between the
//! two subgroups. The adversary maximizes them, the trainer minimizes them.
use crate::errors::EIError;
use crate::utils::{items_to_strings, sign};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Trait defining a fairness proxy.
///
/// Implementations must accept empty inputs and empty subgroups, returning a
/// zero value and a zero gradient for them.
pub trait FairnessProxy {
    /// Scalar disparity.
    fn value(&self, z: &[f64], yhat: &[f64]) -> f64;

    /// Gradient of [`value`](FairnessProxy::value) w.r.t. every `yhat_i`.
    fn gradient(&self, z: &[f64], yhat: &[f64]) -> Vec<f64>;

    fn value_and_gradient(&self, z: &[f64], yhat: &[f64]) -> (f64, Vec<f64>) {
        (self.value(z, yhat), self.gradient(z, yhat))
    }
}

/// Sum over the two groups of `|MSE_g(yhat, 1) - MSE(yhat, 1)|`.
#[derive(Default, Debug, Deserialize, Serialize, Clone, Copy)]
pub struct MeanGapProxy {}

impl MeanGapProxy {
    /// Squared distance to the all-ones target, overall and for groups 0 and 1.
    /// Group entries are `None` when the group has no member.
    fn group_errors(z: &[f64], yhat: &[f64]) -> (f64, [Option<(f64, usize)>; 2]) {
        let mut total = 0.0;
        let mut sums = [0.0; 2];
        let mut counts = [0usize; 2];
        for (z_, p) in z.iter().zip(yhat) {
            let e = (p - 1.0) * (p - 1.0);
            total += e;
            for g in 0..2 {
                if *z_ == g as f64 {
                    sums[g] += e;
                    counts[g] += 1;
                }
            }
        }
        let overall = total / yhat.len() as f64;
        let groups = [0, 1].map(|g| {
            if counts[g] == 0 {
                None
            } else {
                Some((sums[g] / counts[g] as f64, counts[g]))
            }
        });
        (overall, groups)
    }
}

impl FairnessProxy for MeanGapProxy {
    fn value(&self, z: &[f64], yhat: &[f64]) -> f64 {
        if yhat.is_empty() {
            return 0.0;
        }
        let (overall, groups) = Self::group_errors(z, yhat);
        groups
            .iter()
            .flatten()
            .map(|(mse_g, _)| (mse_g - overall).abs())
            .sum()
    }

    fn gradient(&self, z: &[f64], yhat: &[f64]) -> Vec<f64> {
        if yhat.is_empty() {
            return Vec::new();
        }
        let n = yhat.len() as f64;
        let (overall, groups) = Self::group_errors(z, yhat);
        z.iter()
            .zip(yhat)
            .map(|(z_, p)| {
                let de = 2.0 * (p - 1.0);
                let mut g_i = 0.0;
                for (g, group) in groups.iter().enumerate() {
                    if let Some((mse_g, count)) = group {
                        let s = sign(mse_g - overall);
                        let member = if *z_ == g as f64 { de / *count as f64 } else { 0.0 };
                        g_i += s * (member - de / n);
                    }
                }
                g_i
            })
            .collect()
    }
}

/// Squared covariance between the centered group attribute and the scores.
#[derive(Default, Debug, Deserialize, Serialize, Clone, Copy)]
pub struct CovarianceProxy {}

impl CovarianceProxy {
    fn covariance(z: &[f64], yhat: &[f64]) -> (f64, f64) {
        let n = yhat.len() as f64;
        let z_mean = z.iter().sum::<f64>() / n;
        let cov = z.iter().zip(yhat).map(|(z_, p)| (z_ - z_mean) * p).sum::<f64>() / n;
        (cov, z_mean)
    }
}

impl FairnessProxy for CovarianceProxy {
    fn value(&self, z: &[f64], yhat: &[f64]) -> f64 {
        if yhat.is_empty() {
            return 0.0;
        }
        let (cov, _) = Self::covariance(z, yhat);
        cov * cov
    }

    fn gradient(&self, z: &[f64], yhat: &[f64]) -> Vec<f64> {
        if yhat.is_empty() {
            return Vec::new();
        }
        let n = yhat.len() as f64;
        let (cov, z_mean) = Self::covariance(z, yhat);
        z.iter().map(|z_| 2.0 * cov * (z_ - z_mean) / n).collect()
    }
}

/// The built-in proxies, selectable by name.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
pub enum Proxy {
    /// Gap between each group's squared error to the positive outcome and the overall one.
    #[default]
    MeanGap,
    /// Squared covariance of group membership and score.
    Covariance,
}

impl FromStr for Proxy {
    type Err = EIError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MeanGap" => Ok(Proxy::MeanGap),
            "Covariance" => Ok(Proxy::Covariance),
            _ => Err(EIError::ParseString(
                s.to_string(),
                "Proxy".to_string(),
                items_to_strings(vec!["MeanGap", "Covariance"]),
            )),
        }
    }
}

impl FairnessProxy for Proxy {
    fn value(&self, z: &[f64], yhat: &[f64]) -> f64 {
        match self {
            Proxy::MeanGap => MeanGapProxy::default().value(z, yhat),
            Proxy::Covariance => CovarianceProxy::default().value(z, yhat),
        }
    }

    fn gradient(&self, z: &[f64], yhat: &[f64]) -> Vec<f64> {
        match self {
            Proxy::MeanGap => MeanGapProxy::default().gradient(z, yhat),
            Proxy::Covariance => CovarianceProxy::default().gradient(z, yhat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_gradient<P: FairnessProxy>(proxy: &P, z: &[f64], yhat: &[f64]) {
        let g = proxy.gradient(z, yhat);
        let h = 1e-6;
        for i in 0..yhat.len() {
            let mut plus = yhat.to_vec();
            plus[i] += h;
            let mut minus = yhat.to_vec();
            minus[i] -= h;
            let numeric = (proxy.value(z, &plus) - proxy.value(z, &minus)) / (2.0 * h);
            assert!((numeric - g[i]).abs() < 1e-6, "index {}: {} vs {}", i, numeric, g[i]);
        }
    }

    #[test]
    fn test_mean_gap_value() {
        let z = vec![0.0, 0.0, 1.0, 1.0];
        let yhat = vec![1.0, 1.0, 0.0, 0.0];
        // overall 0.5, group 0 -> 0, group 1 -> 1
        assert!((MeanGapProxy::default().value(&z, &yhat) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mean_gap_single_group_is_zero() {
        let yhat = vec![0.1, 0.4, 0.8];
        assert_eq!(MeanGapProxy::default().value(&[0.0, 0.0, 0.0], &yhat), 0.0);
        assert_eq!(MeanGapProxy::default().value(&[1.0, 1.0, 1.0], &yhat), 0.0);
        assert!(MeanGapProxy::default()
            .gradient(&[1.0, 1.0, 1.0], &yhat)
            .iter()
            .all(|g| *g == 0.0));
    }

    #[test]
    fn test_empty_inputs() {
        for proxy in [Proxy::MeanGap, Proxy::Covariance] {
            assert_eq!(proxy.value(&[], &[]), 0.0);
            assert!(proxy.gradient(&[], &[]).is_empty());
        }
    }

    #[test]
    fn test_covariance_value() {
        let z = vec![0.0, 1.0];
        let yhat = vec![0.2, 0.6];
        // mean((z - 0.5) * yhat) = (-0.1 + 0.3) / 2 = 0.1
        assert!((CovarianceProxy::default().value(&z, &yhat) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_permutation_invariance() {
        let z = vec![0.0, 1.0, 1.0, 0.0, 1.0];
        let yhat = vec![0.1, 0.9, 0.3, 0.45, 0.7];
        let perm = [3, 0, 4, 1, 2];
        let zp: Vec<f64> = perm.iter().map(|&i| z[i]).collect();
        let yp: Vec<f64> = perm.iter().map(|&i| yhat[i]).collect();
        for proxy in [Proxy::MeanGap, Proxy::Covariance] {
            let a = proxy.value(&z, &yhat);
            let b = proxy.value(&zp, &yp);
            assert!(a.is_finite() && a >= 0.0);
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        let z = vec![0.0, 1.0, 1.0, 0.0, 1.0, 0.0];
        let yhat = vec![0.15, 0.92, 0.33, 0.41, 0.77, 0.05];
        check_gradient(&MeanGapProxy::default(), &z, &yhat);
        check_gradient(&CovarianceProxy::default(), &z, &yhat);
        // Continuous attribute for the covariance proxy.
        check_gradient(&CovarianceProxy::default(), &[0.2, 1.7, -0.4], &[0.3, 0.6, 0.9]);
    }

    #[test]
    fn test_proxy_from_str() {
        assert_eq!(Proxy::from_str("MeanGap").unwrap(), Proxy::MeanGap);
        assert_eq!("Covariance".parse::<Proxy>().unwrap(), Proxy::Covariance);
        assert!(Proxy::from_str("Parity").is_err());
    }
}
