// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Shared fixtures: the owner core's side of a boot.

use tandem::platform::MockPlatform;
use tandem::{BoardConfig, Delivery};
use tandem_abi::rpmsg::RpmsgLayout;
use tandem_abi::{
    RpmsgResourceTable, TableBuilder, TraceEntry, VIRTIO_ID_RPMSG, VdevEntry, VringEntry,
};

/// Device address of the trace buffer the owner allocated.
pub const TRACE_DA: u32 = 0x9F00_0000;

/// Route `tracing` output through the test harness. `RUST_LOG` filters.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// AM64x board with the given delivery mode.
pub fn board(delivery: Delivery) -> BoardConfig {
    let mut board = BoardConfig::TI_AM64X_R5F;
    board.notify = board.notify.with_delivery(delivery);
    board
}

/// The table the owner leaves behind after loading the firmware: both
/// rings placed at the start of the shared window.
pub fn loaded_table() -> Vec<u8> {
    TableBuilder::new()
        .vdev(
            VdevEntry::new(VIRTIO_ID_RPMSG, 31, 1, 2),
            &[
                VringEntry::new(0xA200_0000, 0x1000, 256, 1),
                VringEntry::new(0xA200_4000, 0x1000, 256, 2),
            ],
            &[0; 8],
        )
        .trace(TraceEntry::new(TRACE_DA, 0x1000, "trace:r5fss0_0"))
        .build()
}

/// The firmware's static table before the owner fills in ring addresses.
pub fn firmware_table() -> RpmsgResourceTable {
    RpmsgResourceTable::new(RpmsgLayout::TI_AM64X_R5F, TRACE_DA)
}

/// Mock platform holding `image` at the board's table address.
pub fn owner_with(board: &BoardConfig, image: &[u8]) -> MockPlatform {
    let mut platform = MockPlatform::new();
    assert!(platform.add_ram(board.rsc_table, board.rsc_table_size));
    platform.write_phys(board.rsc_table, image);
    platform
}
