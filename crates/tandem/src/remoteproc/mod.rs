// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Platform adapter.
//!
//! [`RemoteProc`] owns the platform, the mailbox doorbell and every mapped
//! region, and offers the transport layer four operations: `init`, `map`,
//! `notify` and `poll_or_wait`, plus `remove` to tear it all down.
//!
//! ```text
//! Uninitialized --init--> Initialized --map--> Running
//!       \                      |                  |
//!        \------------------remove-----------------+--> ShuttingDown --> Removed
//! ```


use alloc::sync::Arc;
use core::mem::ManuallyDrop;
use core::ptr;

use tandem_abi::{Paddr, Vaddr};
use tracing::{debug, info, warn};

use crate::config::{Delivery, NotifyConfig};
use crate::doorbell::Doorbell;
use crate::error::{Error, Result, TableDefect};
use crate::mailbox::Mailbox;
use crate::memory::{Lookup, MappedRegion, MemAttr, RegionMap};
use crate::platform::{IrqHandler, MapError, Platform};
use crate::rsc_table::ParsedTable;

/// Lifecycle of the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    /// Mailbox claimed and handler installed.
    Initialized,
    /// At least one region mapped.
    Running,
    ShuttingDown,
    /// Terminal.
    Removed,
}

/// How `poll_or_wait` behaves when nothing is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Return [`QueueEvent::NoEvent`] immediately.
    NonBlocking,
    /// Park the core until the doorbell has something.
    BlockUntilEvent,
}

/// Result of one `poll_or_wait` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEvent {
    /// The peer kicked this queue id.
    Queue(u32),
    NoEvent,
}

impl QueueEvent {
    #[must_use]
    pub const fn queue_id(self) -> Option<u32> {
        match self {
            Self::Queue(id) => Some(id),
            Self::NoEvent => None,
        }
    }
}

/// Notification wiring that exists between `init` and `remove`.
struct Wiring<M> {
    doorbell: Arc<Doorbell<M>>,
    config: NotifyConfig,
    /// Bit per registered vring notify id.
    queue_ids: u32,
}

/// The platform adapter for one remote-processor channel.
pub struct RemoteProc<P: Platform> {
    platform: P,
    state: State,
    wiring: Option<Wiring<P::Mailbox>>,
    regions: RegionMap,
}

impl<P: Platform> RemoteProc<P> {
    /// Wrap `platform`. Nothing is claimed until [`RemoteProc::init`].
    pub const fn new(platform: P) -> Self {
        Self {
            platform,
            state: State::Uninitialized,
            wiring: None,
            regions: RegionMap::new(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub const fn platform(&self) -> &P {
        &self.platform
    }

    pub const fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Give the platform back, releasing anything still claimed first.
    pub fn into_platform(mut self) -> P {
        self.teardown();
        let mut this = ManuallyDrop::new(self);
        // SAFETY: `this` is never used or dropped again. Every field other
        // than `platform` is dropped in place exactly once and `platform`
        // is moved out exactly once.
        unsafe {
            ptr::drop_in_place(&raw mut this.wiring);
            ptr::drop_in_place(&raw mut this.regions);
            ptr::read(&raw const this.platform)
        }
    }

    /// The doorbell, once initialized.
    #[must_use]
    pub fn doorbell(&self) -> Option<&Doorbell<P::Mailbox>> {
        self.wiring.as_ref().map(|wiring| &*wiring.doorbell)
    }

    /// Active notification configuration, once initialized.
    #[must_use]
    pub fn notify_config(&self) -> Option<&NotifyConfig> {
        self.wiring.as_ref().map(|wiring| &wiring.config)
    }

    /// Bitmask of vring notify ids registered at `init`.
    #[must_use]
    pub fn queue_ids(&self) -> u32 {
        self.wiring.as_ref().map_or(0, |wiring| wiring.queue_ids)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Claim the mailbox, register the table's vrings and install the
    /// doorbell.
    ///
    /// With [`Delivery::Interrupt`] the handler is attached and the mailbox
    /// line enabled. With [`Delivery::BusyPoll`] the mailbox interrupt is
    /// left disabled and no handler is installed.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] unless uninitialized,
    /// [`Error::DeviceRegistrationFailed`] if the mailbox cannot be claimed
    /// or the handler attached, and [`Error::MalformedTable`] if a vring id
    /// is outside the configured width. Nothing stays claimed on failure.
    pub fn init(&mut self, table: &ParsedTable, config: &NotifyConfig) -> Result<()> {
        self.expect_state("init", &[State::Uninitialized])?;

        let mailbox = self.platform.claim_mailbox(config).map_err(|err| {
            warn!(base = %config.mailbox_base, %err, "mailbox claim failed");
            Error::DeviceRegistrationFailed(err)
        })?;
        if let Err(err) = config.validate(mailbox.queue_count()) {
            warn!(%err, "mailbox configuration rejected");
            self.platform.release_mailbox();
            return Err(err.into());
        }

        let queue_ids = match register_vrings(table, config) {
            Ok(ids) => ids,
            Err(err) => {
                self.platform.release_mailbox();
                return Err(err);
            }
        };

        let doorbell = Arc::new(Doorbell::new(mailbox, config.rx_queue, config.queue_ids));
        match config.delivery {
            Delivery::Interrupt => {
                let handler: Arc<dyn IrqHandler> = doorbell.clone();
                if let Err(err) = self.platform.attach_handler(config.irq, handler) {
                    warn!(irq = config.irq, %err, "mailbox handler refused");
                    self.platform.release_mailbox();
                    return Err(err.into());
                }
                doorbell.mailbox().enable_interrupt(config.rx_queue);
                self.platform
                    .enable(config.irq, config.priority, config.trigger);
            }
            Delivery::BusyPoll => doorbell.mailbox().disable_interrupt(config.rx_queue),
        }

        self.wiring = Some(Wiring {
            doorbell,
            config: *config,
            queue_ids,
        });
        self.state = State::Initialized;
        info!(
            irq = config.irq,
            delivery = ?config.delivery,
            queue_ids,
            "remote processor initialized"
        );
        Ok(())
    }

    /// Make `size` bytes at `phys` locally addressable and record them.
    ///
    /// A range inside an already recorded region returns that region.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] before `init` or after `remove`;
    /// [`Error::MappingFailed`] for an empty range, a partial overlap with a
    /// recorded region, or a refusal by the platform.
    pub fn map(&mut self, phys: Paddr, size: usize, attr: MemAttr) -> Result<MappedRegion> {
        self.expect_state("map", &[State::Initialized, State::Running])?;
        if size == 0 || phys.checked_end(size as u64).is_none() {
            return Err(MapError::InvalidRange.into());
        }

        match self.regions.lookup(phys, size) {
            Lookup::Contained(region) => return Ok(*region),
            Lookup::Overlaps(region) => {
                warn!(%phys, size, existing = %region.phys, "range overlaps a mapped region");
                return Err(MapError::AlreadyMapped.into());
            }
            Lookup::Free => {}
        }

        let logical = self.platform.map(phys, size, attr).map_err(|err| {
            warn!(%phys, size, %err, "platform refused mapping");
            Error::MappingFailed(err)
        })?;
        let region = MappedRegion {
            phys,
            logical,
            size,
            attr,
        };
        self.regions.insert(region);
        debug!(%phys, %logical, size, "mapped region");

        if self.state == State::Initialized {
            self.state = State::Running;
            info!("remote processor running");
        }
        Ok(region)
    }

    /// Ring the peer's doorbell with `queue_id` on the outbound queue.
    ///
    /// # Errors
    ///
    /// [`Error::ChannelFull`] if the outbound FIFO is full; the message is
    /// not written and not retried.
    pub fn notify(&self, queue_id: u32) -> Result<()> {
        let wiring = self.wiring("notify")?;
        wiring
            .doorbell
            .mailbox()
            .send(wiring.config.tx_queue, queue_id)?;
        Ok(())
    }

    /// Report the lowest pending queue id, one per call.
    ///
    /// Interrupts are masked only around the claim. In blocking mode the
    /// low-power wait runs while still masked, so an interrupt arriving
    /// between the check and the wait still wakes the core.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] before `init` or after `remove`.
    pub fn poll_or_wait(&self, mode: WaitMode) -> Result<QueueEvent> {
        let wiring = self.wiring("poll_or_wait")?;
        let doorbell = &wiring.doorbell;
        let busy_poll = wiring.config.delivery == Delivery::BusyPoll;

        loop {
            if busy_poll {
                doorbell.service();
            }

            let flags = self.platform.irq_save_disable();
            if let Some(queue_id) = doorbell.claim() {
                self.platform.irq_restore(flags);
                return Ok(QueueEvent::Queue(queue_id));
            }

            match mode {
                WaitMode::NonBlocking => {
                    self.platform.irq_restore(flags);
                    return Ok(QueueEvent::NoEvent);
                }
                WaitMode::BlockUntilEvent if busy_poll => {
                    self.platform.irq_restore(flags);
                    self.platform.relax();
                }
                WaitMode::BlockUntilEvent => {
                    self.platform.wait_for_interrupt();
                    self.platform.irq_restore(flags);
                }
            }
        }
    }

    /// Release the mailbox and every mapped region. Idempotent, and run
    /// implicitly on drop.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` so callers treat it like the other
    /// lifecycle operations.
    pub fn remove(&mut self) -> Result<()> {
        self.teardown();
        Ok(())
    }

    fn teardown(&mut self) {
        if self.state == State::Removed {
            return;
        }
        self.state = State::ShuttingDown;
        info!("remote processor shutting down");

        if let Some(wiring) = self.wiring.take() {
            let config = wiring.config;
            if config.delivery == Delivery::Interrupt {
                self.platform.disable(config.irq);
                self.platform.detach_handler(config.irq);
            }
            wiring.doorbell.mailbox().disable_interrupt(config.rx_queue);
            wiring.doorbell.pending().clear();
            drop(wiring);
            self.platform.release_mailbox();
        }

        for region in self.regions.drain() {
            self.platform.unmap(region.logical, region.size);
            debug!(phys = %region.phys, size = region.size, "unmapped region");
        }

        self.state = State::Removed;
        info!("remote processor removed");
    }

    // =========================================================================
    // Regions
    // =========================================================================

    /// The recorded region containing physical address `pa`.
    #[must_use]
    pub fn region_for_phys(&self, pa: Paddr) -> Option<&MappedRegion> {
        self.regions.containing_phys(pa)
    }

    #[must_use]
    pub fn phys_to_logical(&self, pa: Paddr) -> Option<Vaddr> {
        self.regions.phys_to_logical(pa)
    }

    #[must_use]
    pub fn logical_to_phys(&self, va: Vaddr) -> Option<Paddr> {
        self.regions.logical_to_phys(va)
    }

    pub fn regions(&self) -> impl Iterator<Item = &MappedRegion> + '_ {
        self.regions.iter()
    }

    /// Push this core's writes to `region` out to memory.
    ///
    /// # Errors
    ///
    /// [`Error::MappingFailed`] if `region` is not recorded.
    pub fn writeback(&self, region: &MappedRegion) -> Result<()> {
        self.expect_recorded(region)?;
        self.platform.writeback(region.logical, region.size);
        Ok(())
    }

    /// Drop cached copies of `region` so the peer's writes become visible.
    ///
    /// # Errors
    ///
    /// [`Error::MappingFailed`] if `region` is not recorded.
    pub fn invalidate(&self, region: &MappedRegion) -> Result<()> {
        self.expect_recorded(region)?;
        self.platform.invalidate(region.logical, region.size);
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn expect_state(&self, op: &'static str, allowed: &[State]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidState {
                op,
                state: self.state,
            })
        }
    }

    fn wiring(&self, op: &'static str) -> Result<&Wiring<P::Mailbox>> {
        self.expect_state(op, &[State::Initialized, State::Running])?;
        self.wiring.as_ref().ok_or(Error::InvalidState {
            op,
            state: self.state,
        })
    }

    fn expect_recorded(&self, region: &MappedRegion) -> Result<()> {
        match self.regions.containing_phys(region.phys) {
            Some(recorded) if recorded.covers(region.phys, region.size) => Ok(()),
            _ => Err(MapError::InvalidRange.into()),
        }
    }
}

/// Dropping without [`RemoteProc::remove`] still releases the mailbox,
/// the interrupt line and every region.
impl<P: Platform> Drop for RemoteProc<P> {
    fn drop(&mut self) {
        if self.state != State::Uninitialized {
            self.teardown();
        }
    }
}

/// Collect the notify ids of every vring, checked against the configured width.
fn register_vrings(table: &ParsedTable, config: &NotifyConfig) -> Result<u32> {
    let mut queue_ids = 0u32;
    for (index, vdev) in table.vdevs().enumerate() {
        for vring in &vdev.vrings {
            if vring.notify_id >= config.queue_ids {
                warn!(
                    notify_id = vring.notify_id,
                    width = config.queue_ids,
                    "vring notify id outside configured width"
                );
                return Err(TableDefect::NotifyIdOutOfRange {
                    notify_id: vring.notify_id,
                }
                .into());
            }
            queue_ids |= 1 << vring.notify_id;
            debug!(vdev = index, notify_id = vring.notify_id, "registered vring");
        }
    }
    Ok(queue_ids)
}
