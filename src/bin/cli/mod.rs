use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand, ValueEnum};
use designate_acme_solver::config::{AuthMethod, ClientConfig, ProjectRef, UserRef};
use log::LevelFilter;

macro_rules! env_prefix {
    () => {
        "DESIGNATE_SOLVER_"
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// API group that the solver is registered under with the issuing controller
    #[arg(long, value_name = "GROUP", env = "GROUP_NAME")]
    pub group_name: String,

    /// Set the loglevel of the application
    #[arg(
        value_enum,
        short = 'l',
        long,
        global = true,
        default_value_t = Loglevel::Info,
        value_name = "LEVEL",
        env = concat!(env_prefix!(), "LOGLEVEL")
    )]
    pub loglevel: Loglevel,

    /// Timeout for requests to the OpenStack APIs in seconds
    #[arg(
        long,
        global = true,
        default_value_t = 30,
        env = concat!(env_prefix!(), "TIMEOUT")
    )]
    pub timeout: u64,

    #[command(flatten)]
    pub openstack: OpenStackArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Publish the challenge record
    Present(ChallengeArgs),
    /// Remove the challenge record
    #[command(name = "cleanup")]
    CleanUp(ChallengeArgs),
    /// Handle a complete challenge request as sent by the issuing controller, dispatched on its action
    Handle {
        /// File to read the JSON request from, `-` for stdin
        #[arg(value_name = "FILE", default_value = "-")]
        request: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ChallengeArgs {
    /// The domain the certificate is requested for
    #[arg(long, value_name = "DOMAIN")]
    pub dns_name: String,

    /// Fully qualified name of the TXT record, e.g. `_acme-challenge.example.com.`
    #[arg(long, value_name = "FQDN")]
    pub resolved_fqdn: String,

    /// The challenge key to publish
    #[arg(long)]
    pub key: String,

    /// Designate zone that holds the record
    #[arg(long, value_name = "ZONE_ID")]
    pub zone_id: String,
}

/// OpenStack credentials. These use the standard `OS_*` variables of the OpenStack clients
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct OpenStackArgs {
    /// Keystone v3 endpoint
    #[arg(long, value_name = "URL", env = "OS_AUTH_URL")]
    pub os_auth_url: String,

    #[arg(long, value_name = "NAME", env = "OS_USERNAME", conflicts_with = "os_user_id")]
    pub os_username: Option<String>,

    #[arg(long, value_name = "ID", env = "OS_USER_ID")]
    pub os_user_id: Option<String>,

    #[arg(long, value_name = "PASSWORD", env = "OS_PASSWORD", hide_env_values = true)]
    pub os_password: Option<String>,

    #[arg(
        long,
        value_name = "DOMAIN",
        default_value = "Default",
        env = "OS_USER_DOMAIN_NAME"
    )]
    pub os_user_domain_name: String,

    #[arg(long, value_name = "ID", env = "OS_PROJECT_ID", conflicts_with = "os_project_name")]
    pub os_project_id: Option<String>,

    #[arg(long, value_name = "NAME", env = "OS_PROJECT_NAME")]
    pub os_project_name: Option<String>,

    #[arg(
        long,
        value_name = "DOMAIN",
        default_value = "Default",
        env = "OS_PROJECT_DOMAIN_NAME"
    )]
    pub os_project_domain_name: String,

    #[arg(
        long,
        value_name = "ID",
        env = "OS_APPLICATION_CREDENTIAL_ID",
        requires = "os_application_credential_secret"
    )]
    pub os_application_credential_id: Option<String>,

    #[arg(
        long,
        value_name = "SECRET",
        env = "OS_APPLICATION_CREDENTIAL_SECRET",
        hide_env_values = true
    )]
    pub os_application_credential_secret: Option<String>,

    #[arg(long, value_name = "REGION", env = "OS_REGION_NAME")]
    pub os_region_name: Option<String>,

    /// Service catalog interface to use
    #[arg(long, value_name = "INTERFACE", default_value = "public", env = "OS_INTERFACE")]
    pub os_interface: String,

    /// Use this Designate endpoint instead of looking it up in the service catalog
    #[arg(long, value_name = "URL", env = "OS_DNS_ENDPOINT")]
    pub os_dns_endpoint: Option<String>,
}

impl OpenStackArgs {
    /// Assemble the client configuration, preferring application credentials over passwords
    pub fn client_config(&self, timeout: Duration) -> Result<ClientConfig, String> {
        let auth = match (
            &self.os_application_credential_id,
            &self.os_application_credential_secret,
        ) {
            (Some(id), Some(secret)) => AuthMethod::ApplicationCredential {
                id: id.to_owned(),
                secret: secret.to_owned(),
            },
            _ => {
                let user = match (&self.os_user_id, &self.os_username) {
                    (Some(id), _) => UserRef::Id(id.to_owned()),
                    (None, Some(name)) => UserRef::Name {
                        name: name.to_owned(),
                        domain: self.os_user_domain_name.to_owned(),
                    },
                    (None, None) => {
                        return Err(
                            "either an application credential or a user (OS_USERNAME/OS_USER_ID) is required"
                                .to_string(),
                        )
                    }
                };
                let password = self
                    .os_password
                    .to_owned()
                    .ok_or("OS_PASSWORD is required for password authentication")?;
                let project = match (&self.os_project_id, &self.os_project_name) {
                    (Some(id), _) => Some(ProjectRef::Id(id.to_owned())),
                    (None, Some(name)) => Some(ProjectRef::Name {
                        name: name.to_owned(),
                        domain: self.os_project_domain_name.to_owned(),
                    }),
                    (None, None) => None,
                };
                AuthMethod::Password {
                    user,
                    password,
                    project,
                }
            }
        };

        let mut config = ClientConfig::new(&self.os_auth_url, auth);
        config.region = self.os_region_name.to_owned();
        config.interface = self.os_interface.to_owned();
        config.endpoint_override = self.os_dns_endpoint.to_owned();
        config.timeout = timeout;
        Ok(config)
    }
}

/// Used to set the applications loglevel
// This is essentially a re-creation of log:Level. However, that enum doesn't derive ValueEnum, so we have to do it manually here
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, ValueEnum)]
pub enum Loglevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}
impl From<Loglevel> for LevelFilter {
    fn from(ll: Loglevel) -> Self {
        match ll {
            Loglevel::Error => LevelFilter::Error,
            Loglevel::Warn => LevelFilter::Warn,
            Loglevel::Info => LevelFilter::Info,
            Loglevel::Debug => LevelFilter::Debug,
            Loglevel::Trace => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec![
            "designate-acme-solver",
            "--group-name",
            "acme.example.com",
            "--os-auth-url",
            "https://keystone.example.com/v3",
        ];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn should_have_valid_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn should_parse_present_command() {
        let cli = parse(&[
            "present",
            "--dns-name",
            "example.com",
            "--resolved-fqdn",
            "_acme-challenge.example.com.",
            "--key",
            "abc123",
            "--zone-id",
            "zone-123",
        ]);
        match cli.command {
            Command::Present(args) => {
                assert_eq!(args.zone_id, "zone-123");
                assert_eq!(args.key, "abc123");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn should_prefer_application_credentials() {
        let cli = parse(&[
            "--os-application-credential-id",
            "cred-1",
            "--os-application-credential-secret",
            "secret",
            "--os-username",
            "acme",
            "handle",
        ]);
        let config = cli
            .openstack
            .client_config(Duration::from_secs(cli.timeout))
            .unwrap();
        assert_eq!(
            config.auth,
            AuthMethod::ApplicationCredential {
                id: "cred-1".to_string(),
                secret: "secret".to_string()
            }
        );
        assert_eq!(config.interface, "public");
    }

    #[test]
    fn should_build_password_auth() {
        let cli = parse(&[
            "--os-username",
            "acme",
            "--os-password",
            "secret",
            "--os-project-name",
            "dns",
            "--os-region-name",
            "RegionOne",
            "handle",
        ]);
        let config = cli
            .openstack
            .client_config(Duration::from_secs(cli.timeout))
            .unwrap();
        assert_eq!(
            config.auth,
            AuthMethod::Password {
                user: UserRef::Name {
                    name: "acme".to_string(),
                    domain: "Default".to_string()
                },
                password: "secret".to_string(),
                project: Some(ProjectRef::Name {
                    name: "dns".to_string(),
                    domain: "Default".to_string()
                }),
            }
        );
        assert_eq!(config.region.as_deref(), Some("RegionOne"));
    }

    #[test]
    fn should_require_credentials() {
        let cli = parse(&["handle"]);
        assert!(cli
            .openstack
            .client_config(Duration::from_secs(cli.timeout))
            .is_err());
    }

    #[test]
    fn should_map_loglevel() {
        let cli = parse(&["--loglevel", "debug", "handle"]);
        assert_eq!(cli.loglevel, Loglevel::Debug);
        assert_eq!(LevelFilter::from(cli.loglevel), LevelFilter::Debug);
        assert_eq!(LevelFilter::from(parse(&["handle"]).loglevel), LevelFilter::Info);
    }
}
