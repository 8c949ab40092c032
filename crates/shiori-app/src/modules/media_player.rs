//! Media player client descriptors.
//!
//! Construction is pure value work; network or socket access happens only in
//! [`MediaPlayer::connect`].

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use shiori_config::{DefaultPlayer, MediaPlayerSettings};
use shiori_events::ModuleKind;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::{ModuleError, ModuleResult};
use crate::registry::Module;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Outbound contract of a media player client.
#[async_trait]
pub trait MediaPlayer: Send + Sync {
    /// Check that the player can be reached.
    async fn connect(&self) -> ModuleResult<()>;

    /// Describe the configured player without secrets.
    fn describe(&self) -> PlayerDescriptor;
}

/// Non-secret description of a media player client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerDescriptor {
    /// Player name.
    pub name: &'static str,
    /// Web endpoint or IPC socket.
    pub endpoint: String,
    /// Executable path, if configured.
    pub executable: Option<String>,
}

/// VLC through its web interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vlc {
    host: String,
    port: u16,
    password: String,
    path: String,
}

/// MPC-HC through its web interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpcHc {
    host: String,
    port: u16,
    path: String,
}

/// mpv through its JSON IPC socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mpv {
    socket: String,
    path: String,
}

fn executable(path: &str) -> Option<String> {
    (!path.is_empty()).then(|| path.to_string())
}

async fn probe_tcp(player: &'static str, host: &str, port: u16) -> ModuleResult<()> {
    let endpoint = format!("{host}:{port}");
    let unreachable = |source| ModuleError::PlayerUnreachable {
        player,
        endpoint: endpoint.clone(),
        source,
    };
    timeout(CONNECT_TIMEOUT, TcpStream::connect(endpoint.as_str()))
        .await
        .map_err(|_| unreachable(std::io::ErrorKind::TimedOut.into()))?
        .map_err(unreachable)?;
    Ok(())
}

impl Vlc {
    /// Web interface password, used for HTTP basic auth.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

#[async_trait]
impl MediaPlayer for Vlc {
    async fn connect(&self) -> ModuleResult<()> {
        probe_tcp("vlc", &self.host, self.port).await
    }

    fn describe(&self) -> PlayerDescriptor {
        PlayerDescriptor {
            name: "vlc",
            endpoint: format!("http://{}:{}", self.host, self.port),
            executable: executable(&self.path),
        }
    }
}

#[async_trait]
impl MediaPlayer for MpcHc {
    async fn connect(&self) -> ModuleResult<()> {
        probe_tcp("mpc-hc", &self.host, self.port).await
    }

    fn describe(&self) -> PlayerDescriptor {
        PlayerDescriptor {
            name: "mpc-hc",
            endpoint: format!("http://{}:{}", self.host, self.port),
            executable: executable(&self.path),
        }
    }
}

#[async_trait]
impl MediaPlayer for Mpv {
    async fn connect(&self) -> ModuleResult<()> {
        let socket = PathBuf::from(&self.socket);
        tokio::fs::metadata(&socket)
            .await
            .map(|_| ())
            .map_err(|source| ModuleError::PlayerUnreachable {
                player: "mpv",
                endpoint: self.socket.clone(),
                source,
            })
    }

    fn describe(&self) -> PlayerDescriptor {
        PlayerDescriptor {
            name: "mpv",
            endpoint: self.socket.clone(),
            executable: executable(&self.path),
        }
    }
}

/// The full set of player clients built from one settings section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPlayers {
    default_player: DefaultPlayer,
    vlc: Vlc,
    mpc_hc: MpcHc,
    mpv: Mpv,
}

impl MediaPlayers {
    /// Build every client from `settings`.
    #[must_use]
    pub fn from_settings(settings: &MediaPlayerSettings) -> Self {
        Self {
            default_player: settings.default_player,
            vlc: Vlc {
                host: settings.host.clone(),
                port: settings.vlc_port,
                password: settings.vlc_password.clone(),
                path: settings.vlc_path.clone(),
            },
            mpc_hc: MpcHc {
                host: settings.host.clone(),
                port: settings.mpc_port,
                path: settings.mpc_path.clone(),
            },
            mpv: Mpv {
                socket: settings.mpv_socket.clone(),
                path: settings.mpv_path.clone(),
            },
        }
    }

    /// VLC client.
    #[must_use]
    pub const fn vlc(&self) -> &Vlc {
        &self.vlc
    }

    /// MPC-HC client.
    #[must_use]
    pub const fn mpc_hc(&self) -> &MpcHc {
        &self.mpc_hc
    }

    /// mpv client.
    #[must_use]
    pub const fn mpv(&self) -> &Mpv {
        &self.mpv
    }

    /// Client selected as the default player.
    #[must_use]
    pub fn default_player(&self) -> &dyn MediaPlayer {
        match self.default_player {
            DefaultPlayer::Vlc => &self.vlc,
            DefaultPlayer::MpcHc => &self.mpc_hc,
            DefaultPlayer::Mpv => &self.mpv,
        }
    }

    /// Descriptors for every client.
    #[must_use]
    pub fn describe_all(&self) -> Vec<PlayerDescriptor> {
        vec![self.vlc.describe(), self.mpc_hc.describe(), self.mpv.describe()]
    }
}

#[async_trait]
impl Module for MediaPlayers {
    const KIND: ModuleKind = ModuleKind::MediaPlayer;

    async fn start(&self) -> ModuleResult<()> {
        Ok(())
    }

    async fn stop(&self) -> ModuleResult<()> {
        Ok(())
    }

    fn detail(&self) -> Option<String> {
        Some(self.default_player().describe().name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn descriptors_follow_settings_without_secrets() {
        let players = MediaPlayers::from_settings(&MediaPlayerSettings {
            default_player: DefaultPlayer::Mpv,
            host: "192.168.1.10".into(),
            vlc_port: 9090,
            vlc_password: "hunter2".into(),
            mpv_socket: "/tmp/mpv.sock".into(),
            ..MediaPlayerSettings::default()
        });
        assert_eq!(players.vlc().describe().endpoint, "http://192.168.1.10:9090");
        assert_eq!(players.vlc().password(), "hunter2");
        assert_eq!(players.default_player().describe().name, "mpv");
        assert!(
            players
                .describe_all()
                .iter()
                .all(|descriptor| !descriptor.endpoint.contains("hunter2"))
        );
    }

    #[tokio::test]
    async fn vlc_connect_reaches_listening_port() -> anyhow::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let players = MediaPlayers::from_settings(&MediaPlayerSettings {
            host: "127.0.0.1".into(),
            vlc_port: port,
            ..MediaPlayerSettings::default()
        });
        players.vlc().connect().await?;
        Ok(())
    }

    #[tokio::test]
    async fn mpv_connect_requires_socket() {
        let players = MediaPlayers::from_settings(&MediaPlayerSettings {
            mpv_socket: "/definitely/missing/mpv.sock".into(),
            ..MediaPlayerSettings::default()
        });
        let result = players.mpv().connect().await;
        assert!(matches!(
            result,
            Err(ModuleError::PlayerUnreachable { player: "mpv", .. })
        ));
    }
}
