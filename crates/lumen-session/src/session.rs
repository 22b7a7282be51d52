use std::time::Duration;

use rand::RngCore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lumen_codec::command::CMD_STATUS_REQUEST;
use lumen_codec::packet::{
    CREDENTIAL_ACCEPTED, CREDENTIAL_TAG_LONG_TERM_KEY, CREDENTIAL_TAG_NAME,
    CREDENTIAL_TAG_PASSWORD,
};
use lumen_codec::{
    build_command_packet, build_credential_packet, build_pair_packet, decrypt_status_packet,
    derive_session_key, parse_pair_reply, parse_status, PairReply,
};
use lumen_core::{MacAddress, MeshCredentials, MeshId, StatusFrame};
use lumen_transport::{Characteristic, GattConnector, GattLink};

use crate::error::SessionError;

/// Enables status notifications on the device when written to the status
/// characteristic.
const STATUS_NOTIFY_ENABLE: [u8; 1] = [0x01];

/// One authenticated connection to one mesh member.
///
/// The session key is present exactly while the link is up and pairing
/// succeeded; any transport error clears it before the error is returned,
/// so `is_authenticated` never reports a dead session as live.
pub struct Session<L: GattLink> {
    link: L,
    mac: MacAddress,
    mesh_id: MeshId,
    session_key: Option<[u8; 16]>,
    decoder: Option<JoinHandle<()>>,
}

impl<L: GattLink> std::fmt::Debug for Session<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("mac", &self.mac)
            .field("mesh_id", &self.mesh_id)
            .field("authenticated", &self.session_key.is_some())
            .finish_non_exhaustive()
    }
}

/// Connects to a candidate and runs the pairing handshake, bounded by
/// `timeout` as a whole. Timeouts are reported distinctly from pairing
/// rejection so the caller can tell a slow device from bad credentials.
pub async fn connect<C: GattConnector>(
    connector: &C,
    mac: MacAddress,
    mesh_id: MeshId,
    credentials: &MeshCredentials,
    status_tx: mpsc::UnboundedSender<StatusFrame>,
    timeout: Duration,
) -> Result<Session<C::Link>, SessionError> {
    let link = connector.connect(mac, timeout).await?;
    match tokio::time::timeout(
        timeout,
        Session::establish(link, mac, mesh_id, credentials, status_tx),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(SessionError::Timeout(timeout)),
    }
}

impl<L: GattLink> Session<L> {
    /// Runs the pairing handshake over an already-open link.
    ///
    /// Every status frame decoded from the device's notifications is pushed
    /// into `status_tx`, regardless of which mesh id it concerns; filtering
    /// by destination is the caller's job.
    pub async fn establish(
        mut link: L,
        mac: MacAddress,
        mesh_id: MeshId,
        credentials: &MeshCredentials,
        status_tx: mpsc::UnboundedSender<StatusFrame>,
    ) -> Result<Self, SessionError> {
        let mut session_random = [0_u8; 8];
        rand::thread_rng().fill_bytes(&mut session_random);

        let pair_packet =
            build_pair_packet(credentials.name(), credentials.password(), &session_random)?;
        link.write(Characteristic::Pair, &pair_packet, false).await?;
        link.write(Characteristic::Status, &STATUS_NOTIFY_ENABLE, false)
            .await?;
        let notifications = link.subscribe_status().await?;

        let reply = link.read(Characteristic::Pair).await?;
        match parse_pair_reply(&reply)? {
            PairReply::Accepted { response_random } => {
                let key = derive_session_key(
                    credentials.name(),
                    credentials.password(),
                    &session_random,
                    &response_random,
                )?;
                let decoder = spawn_decoder(notifications, key, mac, status_tx);
                info!("[{}] paired as mesh id {}", mac, mesh_id);
                Ok(Self {
                    link,
                    mac,
                    mesh_id,
                    session_key: Some(key),
                    decoder: Some(decoder),
                })
            }
            PairReply::Rejected => {
                info!("[{}] auth error: check mesh name and password", mac);
                link.disconnect().await;
                Err(SessionError::PairingRejected)
            }
            PairReply::Unexpected(opcode) => {
                warn!("[{}] unexpected pair reply 0x{:02X}", mac, opcode);
                link.disconnect().await;
                Err(SessionError::UnexpectedPairReply(opcode))
            }
        }
    }

    /// Address of the physical device holding this session.
    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    /// Mesh id this physical device answers as 0 for.
    pub fn mesh_id(&self) -> MeshId {
        self.mesh_id
    }

    /// Whether the session key is live.
    pub fn is_authenticated(&self) -> bool {
        self.session_key.is_some()
    }

    /// Builds and writes one command packet.
    ///
    /// `destination` defaults to this device's own mesh id. A transport
    /// failure clears the session key before returning, so the caller's
    /// next `is_authenticated` check reflects reality.
    pub async fn send_command(
        &mut self,
        opcode: u8,
        data: &[u8],
        destination: Option<MeshId>,
        with_response: bool,
    ) -> Result<(), SessionError> {
        let key = self.session_key.ok_or(SessionError::NotAuthenticated)?;
        let destination = destination.unwrap_or(self.mesh_id);
        let packet = build_command_packet(&key, self.mac, destination, opcode, data)?;

        debug!(
            "[{}][{}] writing command 0x{:02X} ({} data bytes)",
            self.mac,
            destination,
            opcode,
            data.len()
        );
        if let Err(err) = self
            .link
            .write(Characteristic::Command, &packet, with_response)
            .await
        {
            warn!("[{}] command write failed, clearing session: {}", self.mac, err);
            self.session_key = None;
            return Err(err.into());
        }
        Ok(())
    }

    /// Requests a status report from `destination` (or this device).
    pub async fn request_status(
        &mut self,
        destination: Option<MeshId>,
    ) -> Result<(), SessionError> {
        self.send_command(CMD_STATUS_REQUEST, &[0x10], destination, false)
            .await
    }

    /// Re-provisions the connected device into another mesh.
    ///
    /// Writes the tagged encrypted name, password, and long-term key to the
    /// pairing characteristic and checks the device's acknowledgement. On
    /// success the device leaves this mesh; the caller is expected to drop
    /// the session afterwards.
    pub async fn update_mesh_credentials(
        &mut self,
        new: &MeshCredentials,
    ) -> Result<(), SessionError> {
        let key = self.session_key.ok_or(SessionError::NotAuthenticated)?;
        let tagged = [
            (CREDENTIAL_TAG_NAME, new.name()),
            (CREDENTIAL_TAG_PASSWORD, new.password()),
            (CREDENTIAL_TAG_LONG_TERM_KEY, new.long_term_key()),
        ];
        for (tag, value) in tagged {
            let packet = build_credential_packet(&key, tag, value)?;
            if let Err(err) = self.link.write(Characteristic::Pair, &packet, true).await {
                self.session_key = None;
                return Err(err.into());
            }
        }

        let reply = match self.link.read(Characteristic::Pair).await {
            Ok(reply) => reply,
            Err(err) => {
                self.session_key = None;
                return Err(err.into());
            }
        };
        match reply.first() {
            Some(&CREDENTIAL_ACCEPTED) => {
                info!("[{}] mesh credential update accepted", self.mac);
                Ok(())
            }
            Some(&other) => Err(SessionError::CredentialUpdateRefused(other)),
            None => Err(SessionError::CredentialUpdateRefused(0)),
        }
    }

    /// Clears the session key, stops the notification decoder, and releases
    /// the link. Idempotent; failures are swallowed since this runs on
    /// error-recovery paths.
    pub async fn disconnect(&mut self) {
        self.session_key = None;
        if let Some(decoder) = self.decoder.take() {
            decoder.abort();
        }
        self.link.disconnect().await;
    }
}

fn spawn_decoder(
    mut notifications: mpsc::UnboundedReceiver<Vec<u8>>,
    key: [u8; 16],
    mac: MacAddress,
    status_tx: mpsc::UnboundedSender<StatusFrame>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(raw) = notifications.recv().await {
            let decoded = match decrypt_status_packet(&key, mac, &raw) {
                Ok(decoded) => decoded,
                Err(err) => {
                    warn!("[{}] failed to decrypt notification: {}", mac, err);
                    continue;
                }
            };
            match parse_status(&decoded) {
                Some(frame) => {
                    if status_tx.send(frame).is_err() {
                        break;
                    }
                }
                None => debug!("[{}] notification with unknown opcode, ignoring", mac),
            }
        }
    })
}
