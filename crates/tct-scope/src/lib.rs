//! # TCT Scope Layer
//!
//! LeCroy 示波器客户端：
//!
//! - **传输层** (`transport`): [`InstrumentTransport`]（write / read / read_raw / query），
//!   LeCroy VICP 实现（端口 1861）、原始 SCPI 套接字实现与 VISA 实现（`visa` feature）
//! - **波形解码** (`waveform`): 字节 → 码值 → 电压，时间轴
//! - **客户端** (`client`): [`Oscilloscope`]，单通道读取、四通道单次触发采集、触发模式
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use tct_scope::{Oscilloscope, ScopeOptions};
//!
//! let mut scope = Oscilloscope::connect_vicp("192.168.1.50", Duration::from_secs(5), ScopeOptions::default())?;
//! let [ch1, ch2, ch3, ch4] = scope.acquire_all_channels()?;
//! ```

mod client;
mod error;
pub mod tcp;
pub mod transport;
mod trigger;
pub mod vicp;
pub mod waveform;

#[cfg(feature = "visa")]
pub mod visa;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use client::{CHANNEL_COUNT, Oscilloscope, ScopeOptions, validate_channel};
pub use error::ScopeError;
pub use tcp::TcpInstrument;
pub use transport::InstrumentTransport;
pub use trigger::TriggerMode;
pub use vicp::VicpInstrument;
pub use waveform::{ChannelScale, SampleEncoding, Timebase, Waveform};

#[cfg(feature = "visa")]
pub use visa::VisaInstrument;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockInstrument;
