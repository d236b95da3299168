//! Field rules for the monitoring integrations

use lazy_static::lazy_static;
use streammux_core::ValidationRule;

pub mod fields {
    pub const LICENSE_KEY: &str = "licenseKey";
    pub const NODE_NAME: &str = "nodeName";
    pub const TIER_NAME: &str = "tierName";
    pub const HOST_NAME: &str = "hostName";
    pub const PORT: &str = "port";
    pub const ACCOUNT_NAME: &str = "accountName";
    pub const ACCESS_KEY: &str = "accessKey";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
}

const NAME_PATTERN: &str = r"(?i)^[0-9a-z@._\-]{1,40}$";

lazy_static! {
    pub static ref LICENSE_KEY: ValidationRule =
        ValidationRule::pattern(fields::LICENSE_KEY, r"(?i)^[0-9a-z]{40}$");

    pub static ref NODE_NAME: ValidationRule = ValidationRule::pattern(fields::NODE_NAME, NAME_PATTERN);
    pub static ref TIER_NAME: ValidationRule = ValidationRule::pattern(fields::TIER_NAME, NAME_PATTERN);
    pub static ref ACCOUNT_NAME: ValidationRule =
        ValidationRule::pattern(fields::ACCOUNT_NAME, NAME_PATTERN);

    pub static ref HOST_NAME: ValidationRule =
        ValidationRule::pattern(fields::HOST_NAME, r"(?i)^[0-9a-z][0-9a-z.\-$*_]{1,128}$");

    pub static ref PORT: ValidationRule = ValidationRule::range(fields::PORT, 1..=65535);

    pub static ref ACCESS_KEY: ValidationRule =
        ValidationRule::pattern(fields::ACCESS_KEY, r"(?i)^[0-9a-z]{12}$");

    // Download credentials, checked at provision time only
    pub static ref USERNAME: ValidationRule = ValidationRule::pattern(fields::USERNAME, r"^.{1,40}$");
    pub static ref PASSWORD: ValidationRule = ValidationRule::pattern(
        fields::PASSWORD,
        r"(?i)^[0-9a-z@.,\-/#!$%^\&*;:{}=_`\~()]{1,40}$"
    );
}
