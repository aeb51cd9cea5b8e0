//! Single-worker operation queue
//!
//! The bus is serial: two operations must never interleave, and submission
//! order must be execution order. `BusWorker` owns the [`DeviceLink`] and
//! drains an mpsc queue of requests one at a time; [`BusHandle`] is the
//! cloneable submission side, answering every request through a oneshot
//! completion. Long-running operations (discovery, backup, transfer,
//! reconciliation, persistence) therefore run off the caller's task while
//! staying strictly sequential on the bus. Nothing is cancelled mid-flight
//! and nothing is retried automatically - retry policy belongs to callers.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use servo_model::{DeviceAddress, ParameterCatalog, Profile, ProfileMeta, RegisterKey};

use crate::config::SerialConfig;
use crate::error::{Result, ServoBusError};
use crate::events::EventBus;
use crate::link::{DeviceLink, WriteOutcome};
use crate::reconcile::{ReconciliationSnapshot, UniformWriteOutcome};
use crate::transfer::TransferOutcome;
use crate::transport::Transport;
use crate::{discovery, persist, reconcile, transfer};

type Reply<T> = oneshot::Sender<Result<T>>;

enum BusRequest {
    Connect {
        config: SerialConfig,
        reply: Reply<()>,
    },
    Disconnect {
        reply: Reply<bool>,
    },
    Search {
        max_address: u8,
        reply: Reply<Vec<DeviceAddress>>,
    },
    ReadRegister {
        address: DeviceAddress,
        key: RegisterKey,
        reply: Reply<u16>,
    },
    WriteRegister {
        address: DeviceAddress,
        key: RegisterKey,
        value: u16,
        reply: Reply<WriteOutcome>,
    },
    BackupProfile {
        address: DeviceAddress,
        range: (u16, u16),
        meta: ProfileMeta,
        reply: Reply<Profile>,
    },
    WriteProfile {
        address: DeviceAddress,
        profile: Box<Profile>,
        overwrite_identity: bool,
        reply: Reply<TransferOutcome>,
    },
    TransferToMany {
        profile: Box<Profile>,
        addresses: Vec<DeviceAddress>,
        persist_after: bool,
        reply: Reply<Vec<(DeviceAddress, TransferOutcome)>>,
    },
    Reconcile {
        catalog: Arc<ParameterCatalog>,
        selection: Vec<DeviceAddress>,
        reply: Reply<ReconciliationSnapshot>,
    },
    WriteUniform {
        catalog: Arc<ParameterCatalog>,
        key: RegisterKey,
        value: u16,
        selection: Vec<DeviceAddress>,
        reply: Reply<UniformWriteOutcome>,
    },
    Persist {
        address: DeviceAddress,
        reply: Reply<()>,
    },
}

/// Cloneable submission side of the operation queue
#[derive(Clone)]
pub struct BusHandle {
    tx: mpsc::Sender<BusRequest>,
}

/// Owns the device link and executes queued operations in submission order
pub struct BusWorker {
    link: DeviceLink,
    rx: mpsc::Receiver<BusRequest>,
}

impl BusWorker {
    /// Build a worker around a transport; spawn [`BusWorker::run`] to start
    /// draining the queue.
    pub fn new(transport: Box<dyn Transport>, events: EventBus) -> (BusHandle, BusWorker) {
        let (tx, rx) = mpsc::channel(32);
        let link = DeviceLink::new(transport, events);
        (BusHandle { tx }, BusWorker { link, rx })
    }

    /// Drain the queue until every handle is dropped.
    pub async fn run(mut self) {
        while let Some(request) = self.rx.recv().await {
            self.handle(request).await;
        }
    }

    async fn handle(&self, request: BusRequest) {
        // A dropped reply receiver just means the submitter went away; the
        // operation itself has already run to completion.
        match request {
            BusRequest::Connect { config, reply } => {
                let _ = reply.send(self.link.connect(&config).await);
            }
            BusRequest::Disconnect { reply } => {
                let _ = reply.send(Ok(self.link.disconnect().await));
            }
            BusRequest::Search { max_address, reply } => {
                let _ = reply.send(discovery::search(&self.link, max_address).await);
            }
            BusRequest::ReadRegister {
                address,
                key,
                reply,
            } => {
                let _ = reply.send(self.link.read_register(address, key).await);
            }
            BusRequest::WriteRegister {
                address,
                key,
                value,
                reply,
            } => {
                let _ = reply.send(self.link.write_register(address, key, value).await);
            }
            BusRequest::BackupProfile {
                address,
                range,
                meta,
                reply,
            } => {
                let _ =
                    reply.send(transfer::backup_profile(&self.link, address, range, meta).await);
            }
            BusRequest::WriteProfile {
                address,
                profile,
                overwrite_identity,
                reply,
            } => {
                let _ = reply.send(
                    transfer::write_profile(&self.link, address, &profile, overwrite_identity)
                        .await,
                );
            }
            BusRequest::TransferToMany {
                profile,
                addresses,
                persist_after,
                reply,
            } => {
                let _ = reply.send(
                    transfer::transfer_to_many(&self.link, &profile, &addresses, persist_after)
                        .await,
                );
            }
            BusRequest::Reconcile {
                catalog,
                selection,
                reply,
            } => {
                let _ = reply.send(reconcile::reconcile(&self.link, &catalog, &selection).await);
            }
            BusRequest::WriteUniform {
                catalog,
                key,
                value,
                selection,
                reply,
            } => {
                let _ = reply.send(
                    reconcile::write_uniform(&self.link, &catalog, key, value, &selection).await,
                );
            }
            BusRequest::Persist { address, reply } => {
                let _ = reply.send(persist::persist_to_memory(&self.link, address).await);
            }
        }
    }
}

impl BusHandle {
    async fn submit<T>(
        &self,
        request: BusRequest,
        rx: oneshot::Receiver<Result<T>>,
    ) -> Result<T> {
        self.tx
            .send(request)
            .await
            .map_err(|_| ServoBusError::Worker("operation queue closed".into()))?;
        rx.await
            .map_err(|_| ServoBusError::Worker("worker stopped before replying".into()))?
    }

    pub async fn connect(&self, config: SerialConfig) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.submit(BusRequest::Connect { config, reply }, rx).await
    }

    pub async fn disconnect(&self) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.submit(BusRequest::Disconnect { reply }, rx).await
    }

    pub async fn search(&self, max_address: u8) -> Result<Vec<DeviceAddress>> {
        let (reply, rx) = oneshot::channel();
        self.submit(BusRequest::Search { max_address, reply }, rx)
            .await
    }

    pub async fn read_register(&self, address: DeviceAddress, key: RegisterKey) -> Result<u16> {
        let (reply, rx) = oneshot::channel();
        self.submit(
            BusRequest::ReadRegister {
                address,
                key,
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn write_register(
        &self,
        address: DeviceAddress,
        key: RegisterKey,
        value: u16,
    ) -> Result<WriteOutcome> {
        let (reply, rx) = oneshot::channel();
        self.submit(
            BusRequest::WriteRegister {
                address,
                key,
                value,
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn backup_profile(
        &self,
        address: DeviceAddress,
        range: (u16, u16),
        meta: ProfileMeta,
    ) -> Result<Profile> {
        let (reply, rx) = oneshot::channel();
        self.submit(
            BusRequest::BackupProfile {
                address,
                range,
                meta,
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn write_profile(
        &self,
        address: DeviceAddress,
        profile: Profile,
        overwrite_identity: bool,
    ) -> Result<TransferOutcome> {
        let (reply, rx) = oneshot::channel();
        self.submit(
            BusRequest::WriteProfile {
                address,
                profile: Box::new(profile),
                overwrite_identity,
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn transfer_to_many(
        &self,
        profile: Profile,
        addresses: Vec<DeviceAddress>,
        persist_after: bool,
    ) -> Result<Vec<(DeviceAddress, TransferOutcome)>> {
        let (reply, rx) = oneshot::channel();
        self.submit(
            BusRequest::TransferToMany {
                profile: Box::new(profile),
                addresses,
                persist_after,
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn reconcile(
        &self,
        catalog: Arc<ParameterCatalog>,
        selection: Vec<DeviceAddress>,
    ) -> Result<ReconciliationSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.submit(
            BusRequest::Reconcile {
                catalog,
                selection,
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn write_uniform(
        &self,
        catalog: Arc<ParameterCatalog>,
        key: RegisterKey,
        value: u16,
        selection: Vec<DeviceAddress>,
    ) -> Result<UniformWriteOutcome> {
        let (reply, rx) = oneshot::channel();
        self.submit(
            BusRequest::WriteUniform {
                catalog,
                key,
                value,
                selection,
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn persist(&self, address: DeviceAddress) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.submit(BusRequest::Persist { address, reply }, rx)
            .await
    }
}
