use burn::tensor::{Distribution, Tensor};
use log::info;
use patch_whiten::{
    PatchNormalizer, Whitening, WhiteningConfig,
    backend::{AutoBackend, get_device, log_backend_info},
    diagnostics::{SpectrumSummary, covariance, frobenius_distance_to_identity},
    patches::NormalizeConfig,
};

fn main() -> anyhow::Result<()> {
    patch_whiten::init();

    info!("Patch whitening demonstration");
    log_backend_info();
    let device = get_device();

    // Correlated "patches": independent noise plus a few shared components,
    // the way neighbouring pixels share low-frequency content.
    let (n, d) = (4096, 64);
    let noise = Tensor::<AutoBackend, 2>::random([n, d], Distribution::Normal(0.0, 0.2), &device);
    let sources = Tensor::<AutoBackend, 2>::random([n, 4], Distribution::Normal(0.0, 1.0), &device);
    let mixing = Tensor::<AutoBackend, 2>::random([4, d], Distribution::Uniform(0.0, 1.0), &device);
    let x = sources.matmul(mixing) + noise;
    info!("input: {n} patches of dim {d}");

    let before = frobenius_distance_to_identity(&covariance(x.clone()));
    info!("||cov - I||_F before: {before:.4}");

    let normalizer = PatchNormalizer::new(NormalizeConfig::default())?;
    let x = normalizer.forward(x);

    let gamma = 0.01;
    let whitening = Whitening::new(WhiteningConfig {
        gamma,
        ..Default::default()
    })?;
    let (model, xw) = whitening.fit_transform(x)?;

    if let Some(s) = model.eigenvalues().and_then(|ev| SpectrumSummary::new(ev, gamma)) {
        info!(
            "eigenvalues in [{:.3e}, {:.3e}], {} below gamma, condition {:.3e}",
            s.smallest,
            s.largest,
            s.below_gamma,
            s.condition(gamma)
        );
    }

    let after = frobenius_distance_to_identity(&covariance(xw.clone()));
    info!("||cov - I||_F after:  {after:.4}");
    info!("output shape: {:?}", xw.dims());
    Ok(())
}
