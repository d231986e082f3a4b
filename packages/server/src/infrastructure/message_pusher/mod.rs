//! メッセージ送信（通知）の実装
//!
//! ## 概要
//!
//! ドメイン層の `Outbox` に積まれた行を、接続ごとの writer タスクがソケットへ
//! 書き出します。
//!
//! ## 実装
//!
//! - `tcp`: 任意の `AsyncWrite`（通常は TCP ストリームの書き込み側）への実装

pub mod tcp;

pub use tcp::{WriterExit, pusher_loop};
