//! Broker configuration
//!
//! All settings arrive from the environment (or flags); the maximum volume
//! size and the name prefix are validated once at startup so a misconfigured
//! broker fails before it starts serving.

use clap::Parser;

use crate::broker::capacity::{parse_capacity, MIN_VOLUME_SIZE_BYTES};
use crate::error::{Error, Result};

/// Open Service Broker for SMB shares on NetApp ONTAP arrays
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Username the platform must present on every broker API call
    #[arg(long, env = "BROKER_USERNAME")]
    pub broker_username: String,

    /// Password the platform must present on every broker API call
    #[arg(long, env = "BROKER_PASSWORD")]
    pub broker_password: String,

    /// ONTAP cluster management URL, e.g. https://cluster.example.com
    #[arg(long, env = "ONTAP_URL")]
    pub ontap_url: String,

    /// ONTAP API and CLI username
    #[arg(long, env = "ONTAP_USER")]
    pub ontap_user: String,

    /// ONTAP API and CLI password
    #[arg(long, env = "ONTAP_PASSWORD")]
    pub ontap_password: String,

    /// Skip TLS certificate verification against the ONTAP REST API
    #[arg(long, env = "ONTAP_SKIP_SSL_CHECK")]
    pub ontap_skip_ssl_check: bool,

    /// SVM hosting the provisioned volumes
    #[arg(long, env = "ONTAP_SVM_NAME")]
    pub ontap_svm_name: String,

    /// Hostname clients use to reach the CIFS server
    #[arg(long, env = "CIFS_HOSTNAME")]
    pub cifs_hostname: String,

    /// Base64 SSH host key the array must present; empty accepts any key
    #[arg(long, env = "TRUSTED_SSH_KEY", default_value = "")]
    pub trusted_ssh_key: String,

    /// Largest volume a request may ask for
    #[arg(long, env = "MAX_VOLUME_SIZE", default_value = "2Ti")]
    pub max_volume_size: String,

    /// Prefix for derived volume names; ONTAP forbids names starting with a
    /// digit, so the prefix must start with a letter
    #[arg(long, env = "VOLUME_NAME_PREFIX", default_value = "A")]
    pub volume_name_prefix: String,

    /// Path of the service catalog file
    #[arg(long, env = "CATALOG_PATH", default_value = "./catalog.json")]
    pub catalog_path: String,

    /// Documentation URL injected into the catalog
    #[arg(long, env = "DOCSURL", default_value = "default")]
    pub docs_url: String,

    /// Listen port for the broker API
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

/// Validated broker configuration
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub broker_username: String,
    pub broker_password: String,
    pub ontap_url: String,
    pub ontap_user: String,
    pub ontap_password: String,
    pub ontap_skip_ssl_check: bool,
    pub ontap_svm_name: String,
    pub cifs_hostname: String,
    pub trusted_ssh_key: Option<String>,
    pub max_volume_size: String,
    pub max_volume_size_bytes: u64,
    pub volume_name_prefix: String,
    pub catalog_path: String,
    pub docs_url: String,
    pub port: u16,
    pub log_level: String,
    pub log_json: bool,
}

impl BrokerConfig {
    /// Validate the raw arguments into a usable configuration
    pub fn resolve(args: Args) -> Result<Self> {
        let max_volume_size_bytes = parse_capacity(&args.max_volume_size).map_err(|_| {
            Error::Configuration(
                "unable to parse MAX_VOLUME_SIZE. Allowed modifiers: K,M,G,T,P,Ki,Mi,Gi,Ti,Pi"
                    .into(),
            )
        })?;
        if max_volume_size_bytes < MIN_VOLUME_SIZE_BYTES {
            return Err(Error::Configuration("MAX_VOLUME_SIZE too small".into()));
        }

        match args.volume_name_prefix.chars().next() {
            Some(c) if c.is_ascii_alphabetic() => {}
            _ => {
                return Err(Error::Configuration(
                    "VOLUME_NAME_PREFIX must start with a letter".into(),
                ))
            }
        }
        if args.volume_name_prefix.contains('-') {
            return Err(Error::Configuration(
                "VOLUME_NAME_PREFIX must not contain hyphens".into(),
            ));
        }

        let trusted_ssh_key = if args.trusted_ssh_key.is_empty() {
            None
        } else {
            Some(args.trusted_ssh_key)
        };

        Ok(Self {
            broker_username: args.broker_username,
            broker_password: args.broker_password,
            ontap_url: args.ontap_url,
            ontap_user: args.ontap_user,
            ontap_password: args.ontap_password,
            ontap_skip_ssl_check: args.ontap_skip_ssl_check,
            ontap_svm_name: args.ontap_svm_name,
            cifs_hostname: args.cifs_hostname,
            trusted_ssh_key,
            max_volume_size: args.max_volume_size,
            max_volume_size_bytes,
            volume_name_prefix: args.volume_name_prefix,
            catalog_path: args.catalog_path,
            docs_url: args.docs_url,
            port: args.port,
            log_level: args.log_level,
            log_json: args.log_json,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn test_args() -> Args {
        Args {
            broker_username: "broker".into(),
            broker_password: "secret".into(),
            ontap_url: "https://cluster.example.com".into(),
            ontap_user: "admin".into(),
            ontap_password: "password".into(),
            ontap_skip_ssl_check: true,
            ontap_svm_name: "svm1".into(),
            cifs_hostname: "nas.example.com".into(),
            trusted_ssh_key: String::new(),
            max_volume_size: "2Ti".into(),
            volume_name_prefix: "A".into(),
            catalog_path: "./catalog.json".into(),
            docs_url: "default".into(),
            port: 3000,
            log_level: "info".into(),
            log_json: false,
        }
    }

    #[test]
    fn test_resolve_parses_max_size_once() {
        let config = BrokerConfig::resolve(test_args()).unwrap();
        assert_eq!(config.max_volume_size_bytes, 2 * 1024 * 1024 * 1024 * 1024);
        assert!(config.trusted_ssh_key.is_none());
    }

    #[test]
    fn test_resolve_rejects_bad_max_size() {
        let mut args = test_args();
        args.max_volume_size = "huge".into();
        assert_matches!(
            BrokerConfig::resolve(args),
            Err(Error::Configuration(msg)) if msg.contains("MAX_VOLUME_SIZE")
        );
    }

    #[test]
    fn test_resolve_rejects_max_size_below_floor() {
        let mut args = test_args();
        args.max_volume_size = "10Mi".into();
        assert_matches!(
            BrokerConfig::resolve(args),
            Err(Error::Configuration(msg)) if msg.contains("too small")
        );
    }

    #[test]
    fn test_resolve_rejects_bad_prefix() {
        let mut args = test_args();
        args.volume_name_prefix = "1vol".into();
        assert_matches!(BrokerConfig::resolve(args), Err(Error::Configuration(_)));

        let mut args = test_args();
        args.volume_name_prefix = "a-b".into();
        assert_matches!(BrokerConfig::resolve(args), Err(Error::Configuration(_)));

        let mut args = test_args();
        args.volume_name_prefix = String::new();
        assert_matches!(BrokerConfig::resolve(args), Err(Error::Configuration(_)));
    }

    #[test]
    fn test_trusted_key_becomes_some_when_set() {
        let mut args = test_args();
        args.trusted_ssh_key = "AAAAB3NzaC1yc2E=".into();
        let config = BrokerConfig::resolve(args).unwrap();
        assert_eq!(config.trusted_ssh_key.as_deref(), Some("AAAAB3NzaC1yc2E="));
    }
}
