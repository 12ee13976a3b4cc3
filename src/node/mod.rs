//! Register bus node.
//!
//! [`Node`] owns the register store and is the single entry point for
//! register traffic, whether it comes from the bus (`External`) or from the
//! firmware itself (`Internal`).
//!
//! ```text
//!  bus / radio ──External──┐
//!                          ▼
//!  firmware ───Internal──▶ Node ──▶ RegisterStore
//!                          │
//!                          ├─ common range ──▶ common::{update,check}_register
//!                          └─ variant range ─▶ ModuleAdapter ──▶ Board, PowerControl
//! ```
//!
//! External writes are access-checked, committed, then handed to the side
//! effect hook.  External reads refresh live registers first.  Internal
//! operations touch the store only.

pub mod common;
pub mod context;
pub mod field;
pub mod indicator;
pub mod nvm;
pub mod store;

pub use context::NodeContext;
pub use store::{Access, RegisterSpec, RegisterStore, RequestSource};

use log::{info, warn};

use crate::config::NodeConfig;
use crate::error::{ErrorCollector, ErrorStack, NodeError, Result};
use crate::modules::ModuleAdapter;
use crate::ports::Board;
use crate::power::PowerControl;
use indicator::IoutIndicator;

/// Derived activity of the node, used to decide whether the main loop may
/// sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Idle,
    Running,
}

pub struct Node<A, B, P> {
    config: NodeConfig,
    store: RegisterStore,
    adapter: A,
    board: B,
    power: P,
    errors: ErrorStack,
    indicator: Option<IoutIndicator>,
    self_address: u8,
}

impl<A: ModuleAdapter, B: Board, P: PowerControl> Node<A, B, P> {
    /// Build the register layout for `adapter`.  Registers hold their error
    /// sentinels until [`init`](Self::init).
    pub fn new(config: NodeConfig, adapter: A, board: B, power: P) -> Result<Self> {
        let store = RegisterStore::new(&common::REGISTERS, adapter.register_table())?;
        let indicator = config.iout_indicator.map(IoutIndicator::new);
        let self_address = config.factory_node_address;
        Ok(Self {
            config,
            store,
            adapter,
            board,
            power,
            errors: ErrorStack::new(),
            indicator,
            self_address,
        })
    }

    /// Bring the store to its boot state.  Calling it again is a restart:
    /// volatile registers return to their sentinels and NVM-backed ones are
    /// reloaded from the mirror.
    pub fn init(&mut self) -> Result<()> {
        self.store.reset_all();
        self.errors.clear();
        if let Some(indicator) = self.indicator.as_mut() {
            indicator.reset();
        }
        let identity = common::Identity {
            board_id: self.adapter.board_id(),
            hw_version_major: self.config.hw_version_major,
            hw_version_minor: self.config.hw_version_minor,
            iout_indicator_fitted: self.indicator.is_some(),
        };
        let factory_address = self
            .config
            .factory_reset
            .then_some(self.config.factory_node_address);

        let (mut ctx, adapter, _) = self.split();
        let address = common::init(&mut ctx, &identity, factory_address)?;
        adapter.init_registers(&mut ctx)?;

        self.self_address = address;
        info!(
            "node: {} initialised at address 0x{address:02X}, {} registers",
            self.adapter.name(),
            self.store.last_address()
        );
        Ok(())
    }

    fn split(&mut self) -> (NodeContext<'_>, &mut A, Option<&mut IoutIndicator>) {
        let ctx = NodeContext::new(
            &mut self.store,
            &mut self.board,
            &mut self.power,
            &mut self.errors,
        );
        (ctx, &mut self.adapter, self.indicator.as_mut())
    }

    // ── Register access ───────────────────────────────────────

    /// Masked write.  External writes to read-only registers are rejected
    /// untouched; accepted external writes run the side-effect hook after
    /// the bits are committed and return its result.
    pub fn write_register(
        &mut self,
        source: RequestSource,
        addr: u8,
        value: u32,
        mask: u32,
    ) -> Result<()> {
        let spec = *self.store.spec(addr)?;
        if source == RequestSource::External && spec.access == Access::ReadOnly {
            warn!("node: external write to read-only register 0x{addr:02X}");
            return Err(NodeError::AccessViolation);
        }
        self.store.write(addr, value, mask)?;
        if source == RequestSource::Internal {
            return Ok(());
        }

        let (mut ctx, adapter, _) = self.split();
        if addr < common::LAST {
            common::check_register(&mut ctx, adapter, addr, mask)
        } else {
            adapter.check_register(&mut ctx, addr, mask)
        }
    }

    /// External reads refresh live registers first; the refreshed value is
    /// stored even when the refresh reports an error.
    pub fn read_register(&mut self, source: RequestSource, addr: u8) -> Result<u32> {
        self.store.spec(addr)?;
        if source == RequestSource::External {
            let (mut ctx, adapter, _) = self.split();
            match addr {
                common::ERROR_STACK => common::pop_error(&mut ctx)?,
                a if a < common::LAST => common::update_register(&mut ctx, a)?,
                a => adapter.update_register(&mut ctx, a)?,
            }
        }
        self.store.read(addr)
    }

    fn check_span(&self, base: u8, len: usize) -> Result<()> {
        if len == 0 {
            return Err(NodeError::NullParameter);
        }
        if usize::from(base) + len.div_ceil(4) > self.store.last_address() {
            return Err(NodeError::InvalidAddress);
        }
        Ok(())
    }

    /// Write `data` little-endian over consecutive registers from `base`.
    /// A partial last register only has the supplied bytes touched.
    pub fn write_byte_array(&mut self, source: RequestSource, base: u8, data: &[u8]) -> Result<()> {
        self.check_span(base, data.len())?;
        for (offset, chunk) in (0..=u8::MAX).zip(data.chunks(4)) {
            let (value, mask) = chunk.iter().enumerate().fold((0u32, 0u32), |(v, m), (i, b)| {
                (v | (u32::from(*b) << (8 * i)), m | field::byte_mask(i))
            });
            self.write_register(source, base + offset, value, mask)?;
        }
        Ok(())
    }

    /// Fill `out` from consecutive registers starting at `base`.
    pub fn read_byte_array(&mut self, source: RequestSource, base: u8, out: &mut [u8]) -> Result<()> {
        self.check_span(base, out.len())?;
        for (offset, chunk) in (0..=u8::MAX).zip(out.chunks_mut(4)) {
            let value = self.read_register(source, base + offset)?;
            for (byte, le) in chunk.iter_mut().zip(value.to_le_bytes()) {
                *byte = le;
            }
        }
        Ok(())
    }

    pub fn read_nvm(&mut self, addr: u8) -> Result<u32> {
        self.store.spec(addr)?;
        Ok(nvm::read_word(&mut self.board, addr)?)
    }

    pub fn write_nvm(&mut self, addr: u8, value: u32) -> Result<()> {
        self.store.spec(addr)?;
        Ok(nvm::write_word(&mut self.board, addr, value)?)
    }

    // ── Main loop ─────────────────────────────────────────────

    /// One pass of the cooperative loop.  Every task runs; the first
    /// failure is returned and all of them are recorded.
    pub fn process(&mut self, now_secs: u32) -> Result<()> {
        let control = self.store.read(common::CONTROL_0)?;
        if field::read(control, common::CONTROL_0_MASK_RTRG) != 0 {
            warn!("node: reset requested over the bus");
            self.store.write(common::CONTROL_0, 0, common::CONTROL_0_MASK_RTRG)?;
            self.board.software_reset();
        }

        let mut collector = ErrorCollector::new();
        let (mut ctx, adapter, indicator) = self.split();
        let result = adapter.process(&mut ctx, now_secs);
        ctx.record(&mut collector, result);
        if let Some(indicator) = indicator {
            let result = indicator.process(&mut ctx, now_secs);
            ctx.record(&mut collector, result);
        }
        collector.finish()
    }

    /// Run every register updater, as for a broadcast read.  The error
    /// stack is not drained.
    pub fn refresh_all(&mut self) -> Result<()> {
        let last = self.store.last_address();
        let mut collector = ErrorCollector::new();
        let (mut ctx, adapter, _) = self.split();
        for addr in (0..=u8::MAX).take(last) {
            let result = if addr < common::LAST {
                common::update_register(&mut ctx, addr)
            } else {
                adapter.update_register(&mut ctx, addr)
            };
            ctx.record(&mut collector, result);
        }
        collector.finish()
    }

    pub fn state(&self) -> NodeState {
        if self.board.is_active() || self.adapter.is_active() {
            NodeState::Running
        } else {
            NodeState::Idle
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn self_address(&self) -> u8 {
        self.self_address
    }

    /// One past the highest valid register address.
    pub fn last_address(&self) -> usize {
        self.store.last_address()
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn power(&self) -> &P {
        &self.power
    }

    pub fn errors(&self) -> &ErrorStack {
        &self.errors
    }
}
