use tap_handle::constants::DEFAULT_PART_KEY;
use tap_handle::{
    build_tap_handle, default_output_dir, export_parts, init_logging, BuildConfig, LogConfig,
    TapHandleSpec,
};
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(&LogConfig::default())?;

    let config = BuildConfig::default();
    let mut kernel = config.session();
    let spec = TapHandleSpec::with_tap_diameter(3.0);

    let build = build_tap_handle(&mut kernel, &spec, &config)?;
    let out_dir = default_output_dir();
    let parts = export_parts(&mut kernel, &[(DEFAULT_PART_KEY, build.solid)], &out_dir)?;

    for part in &parts {
        info!(
            key = %part.key,
            stl = %part.stl_path.display(),
            step = %part.step_path.display(),
            "wrote part"
        );
    }
    Ok(())
}
