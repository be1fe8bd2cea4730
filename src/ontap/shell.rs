//! Interactive clustershell automation
//!
//! CIFS local user accounts have no REST endpoint on the array; the only way
//! to manage them is the interactive CLI reached over SSH. Each operation
//! dials a fresh session, drives a scripted exchange, and tears the session
//! down before returning; no session reuse or pooling.
//!
//! The password exchange is prompt-driven: output is read until the expected
//! prompt appears, then the next token is written. An unrecognized prompt or
//! a read timeout fails the operation with what was actually seen instead of
//! writing blindly into the channel.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ssh2::{Channel, ExtendedData, Session};
use tokio::task;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// CLI prompt after the account-create command starts
const PASSWORD_PROMPT: &str = "Enter the password:";
/// CLI prompt after the first password line is accepted
const CONFIRM_PROMPT: &str = "Confirm the password:";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the clustershell dialer
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Cluster management hostname
    pub host: String,
    /// SSH port
    pub port: u16,
    /// CLI username
    pub username: String,
    /// CLI password
    pub password: String,
    /// Base64 host key the array must present; `None` accepts any key
    pub trusted_host_key: Option<String>,
    /// TCP connect timeout
    pub dial_timeout: Duration,
    /// Per-read timeout while waiting for a prompt
    pub read_timeout: Duration,
}

impl ShellConfig {
    /// Config with the fixed dial/read timeouts used in production
    pub fn new(
        host: &str,
        username: &str,
        password: &str,
        trusted_host_key: Option<String>,
    ) -> Self {
        Self {
            host: host.to_string(),
            port: 22,
            username: username.to_string(),
            password: password.to_string(),
            trusted_host_key,
            dial_timeout: Duration::from_secs(15),
            read_timeout: Duration::from_secs(10),
        }
    }
}

// =============================================================================
// Shell Automation
// =============================================================================

/// Driver for the account lifecycle commands on the array CLI
pub struct ShellAutomation {
    config: ShellConfig,
}

impl ShellAutomation {
    pub fn new(config: ShellConfig) -> Self {
        Self { config }
    }

    /// Create a local CIFS account.
    ///
    /// The binding id travels in the account's full-name field so the account
    /// can be found again on unbind without any stored mapping.
    pub async fn create_local_user(
        &self,
        username: &str,
        password: &str,
        full_name: &str,
    ) -> Result<()> {
        let config = self.config.clone();
        let username = username.to_string();
        let password = password.to_string();
        let full_name = full_name.to_string();

        run_blocking(move || create_local_user_blocking(&config, &username, &password, &full_name))
            .await
    }

    /// Look up the account whose full-name field carries the given label.
    ///
    /// `Ok(None)` is the designed no-match outcome; only session or command
    /// failures are errors.
    pub async fn find_local_user(
        &self,
        svm_name: &str,
        full_name: &str,
    ) -> Result<Option<String>> {
        let config = self.config.clone();
        let svm_name = svm_name.to_string();
        let full_name = full_name.to_string();

        run_blocking(move || find_local_user_blocking(&config, &svm_name, &full_name)).await
    }

    /// Delete a local CIFS account by username
    pub async fn delete_local_user(&self, username: &str) -> Result<()> {
        let config = self.config.clone();
        let username = username.to_string();

        run_blocking(move || delete_local_user_blocking(&config, &username)).await
    }
}

/// Run one blocking shell exchange off the async runtime
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| Error::ShellConnect(format!("shell task failed: {}", e)))?
}

// =============================================================================
// Blocking Exchanges
// =============================================================================

fn create_local_user_blocking(
    config: &ShellConfig,
    username: &str,
    password: &str,
    full_name: &str,
) -> Result<()> {
    let session = dial(config)?;
    let mut channel = open_channel(&session)?;

    let command = create_command(username, full_name);
    debug!("CLI exec: {}", command);
    channel.exec(&command)?;

    let mut transcript = String::new();
    expect_prompt(&mut channel, PASSWORD_PROMPT, &mut transcript)?;
    channel.write_all(format!("{}\n", password).as_bytes())?;
    expect_prompt(&mut channel, CONFIRM_PROMPT, &mut transcript)?;
    channel.write_all(format!("{}\n", password).as_bytes())?;
    channel.write_all(b"exit\n")?;
    channel.send_eof()?;

    transcript.push_str(&drain(&mut channel));
    finish(channel, transcript)
}

fn find_local_user_blocking(
    config: &ShellConfig,
    svm_name: &str,
    full_name: &str,
) -> Result<Option<String>> {
    let session = dial(config)?;
    let mut channel = open_channel(&session)?;

    let command = show_command(full_name);
    debug!("CLI exec: {}", command);
    channel.exec(&command)?;

    let output = drain(&mut channel);
    finish(channel, output.clone())?;

    Ok(parse_user_listing(&output, svm_name))
}

fn delete_local_user_blocking(config: &ShellConfig, username: &str) -> Result<()> {
    let session = dial(config)?;
    let mut channel = open_channel(&session)?;

    let command = delete_command(username);
    debug!("CLI exec: {}", command);
    channel.exec(&command)?;

    let output = drain(&mut channel);
    finish(channel, output)
}

// =============================================================================
// Session Plumbing
// =============================================================================

/// Dial, verify the host key, and authenticate a fresh session
fn dial(config: &ShellConfig) -> Result<Session> {
    let address = (config.host.as_str(), config.port)
        .to_socket_addrs()
        .map_err(|e| Error::ShellConnect(format!("cannot resolve {}: {}", config.host, e)))?
        .next()
        .ok_or_else(|| Error::ShellConnect(format!("cannot resolve {}", config.host)))?;

    let tcp = TcpStream::connect_timeout(&address, config.dial_timeout)
        .map_err(|e| Error::ShellConnect(format!("{}:{}: {}", config.host, config.port, e)))?;

    let mut session = Session::new()?;
    session.set_timeout(config.dial_timeout.as_millis() as u32);
    session.set_tcp_stream(tcp);
    session.handshake()?;

    verify_host_key(config, &session)?;

    session.userauth_password(&config.username, &config.password)?;
    session.set_timeout(config.read_timeout.as_millis() as u32);

    Ok(session)
}

fn verify_host_key(config: &ShellConfig, session: &Session) -> Result<()> {
    let Some(trusted) = config.trusted_host_key.as_deref() else {
        warn!(
            "no trusted SSH host key configured, accepting any key from {}",
            config.host
        );
        return Ok(());
    };

    let (key, _key_type) = session.host_key().ok_or(Error::HostKeyMismatch)?;
    if BASE64.encode(key) != trusted.trim() {
        return Err(Error::HostKeyMismatch);
    }
    Ok(())
}

fn open_channel(session: &Session) -> Result<Channel> {
    let mut channel = session.channel_session()?;
    // the CLI writes prompts and diagnostics on both streams
    channel.handle_extended_data(ExtendedData::Merge)?;
    Ok(channel)
}

/// Read until the prompt shows up in the output.
///
/// EOF or a read timeout before the prompt appears is a distinct failure
/// carrying everything that was seen instead.
fn expect_prompt(channel: &mut Channel, prompt: &'static str, transcript: &mut String) -> Result<()> {
    let start = transcript.len();
    let mut buf = [0u8; 512];
    loop {
        if transcript[start..].contains(prompt) {
            return Ok(());
        }
        match channel.read(&mut buf) {
            Ok(0) => {
                return Err(Error::UnexpectedPrompt {
                    expected: prompt,
                    saw: transcript[start..].to_string(),
                })
            }
            Ok(n) => transcript.push_str(&String::from_utf8_lossy(&buf[..n])),
            Err(_) => {
                return Err(Error::UnexpectedPrompt {
                    expected: prompt,
                    saw: transcript[start..].to_string(),
                })
            }
        }
    }
}

/// Read whatever remains until EOF or timeout
fn drain(channel: &mut Channel) -> String {
    let mut output = String::new();
    let mut buf = [0u8; 512];
    loop {
        match channel.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => output.push_str(&String::from_utf8_lossy(&buf[..n])),
        }
    }
    output
}

/// Close the channel and turn a nonzero exit status into a failure
fn finish(mut channel: Channel, output: String) -> Result<()> {
    channel.wait_close()?;
    let status = channel.exit_status()?;
    if status != 0 {
        return Err(Error::ShellCommand { status, output });
    }
    Ok(())
}

// =============================================================================
// Commands & Parsing
// =============================================================================

fn create_command(username: &str, full_name: &str) -> String {
    format!(
        "vserver cifs users-and-groups local-user create -user-name {} -full-name {}",
        username, full_name
    )
}

fn show_command(full_name: &str) -> String {
    format!(
        "vserver cifs users-and-groups local-user show -fields user-name -full-name {}",
        full_name
    )
}

fn delete_command(username: &str) -> String {
    format!(
        "vserver cifs users-and-groups local-user delete -user-name {}",
        username
    )
}

/// Pull the username out of the listing's tabular output.
///
/// The account row is the line starting with the SVM name; everything after
/// that column is the (domain-qualified) username.
fn parse_user_listing(output: &str, svm_name: &str) -> Option<String> {
    for line in output.lines() {
        if let Some(rest) = line.strip_prefix(svm_name) {
            let user = rest.trim();
            if !user.is_empty() {
                return Some(user.to_string());
            }
        }
    }
    None
}
