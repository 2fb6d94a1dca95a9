//! Negative binomial distribution utilities

use statrs::function::gamma::ln_gamma;

/// Floor on fitted means inside IRLS
pub const MIN_MU: f64 = 0.5;

/// Maximum eta value to prevent overflow (exp(700) ≈ 1e304)
pub const MAX_ETA: f64 = 700.0;

/// Mean of a count given the linear predictor and the library size offset
///
/// mu = library_size * exp(eta)
pub fn nb_mean(eta: f64, library_size: f64) -> f64 {
    library_size * eta.clamp(-MAX_ETA, MAX_ETA).exp()
}

/// Size above which the gamma ratio switches to its Stirling expansion
const STIRLING_SIZE: f64 = 1e4;

/// Log probability of `y` under NB(mean `mu`, dispersion `phi`), size = 1/phi
pub fn nb_log_likelihood(y: f64, mu: f64, phi: f64) -> f64 {
    if mu <= 0.0 {
        return if y == 0.0 { 0.0 } else { f64::NEG_INFINITY };
    }
    if phi <= 0.0 {
        // Poisson limit
        return y * mu.ln() - mu - ln_gamma(y + 1.0);
    }

    let size = 1.0 / phi;
    let log1p_mu = (mu / size).ln_1p();
    if size <= STIRLING_SIZE {
        return ln_gamma(y + size) - ln_gamma(size) - ln_gamma(y + 1.0) - size * log1p_mu
            + y * ((mu / size).ln() - log1p_mu);
    }

    // ln G(y+size) - ln G(size) - y ln(size); the y ln(size) cancels against the mean term
    let gamma_ratio =
        (size + y - 0.5) * (y / size).ln_1p() - y - y / (12.0 * size * (size + y));
    gamma_ratio - ln_gamma(y + 1.0) + y * mu.ln() - (size + y) * log1p_mu
}

/// IRLS working weight, W = mu / (1 + phi * mu)
pub fn nb_weight(mu: f64, phi: f64) -> f64 {
    mu / (1.0 + phi * mu)
}
