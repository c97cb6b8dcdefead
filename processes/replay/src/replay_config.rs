use config::Config;
use tracing::info;

const DEFAULT_CHECK_EXPECTED: (&str, bool) = ("check-expected", true);

pub struct ReplayConfig {
    pub check_expected: bool,
}

impl ReplayConfig {
    fn conf_bool(config: &Config, keydef: (&str, bool)) -> bool {
        let actual = config.get_bool(keydef.0).unwrap_or(keydef.1);
        info!("Using {} = {}", keydef.0, actual);
        actual
    }

    pub fn new(config: &Config) -> Self {
        Self {
            check_expected: Self::conf_bool(config, DEFAULT_CHECK_EXPECTED),
        }
    }
}
