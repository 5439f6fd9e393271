pub mod config;
pub mod ctx;
pub mod emit;
pub mod ops;

use ctx::LogCtx;

pub fn fetch() -> LogCtx<ops::fetch::Fetch> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn deliver() -> LogCtx<ops::deliver::Deliver> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn source() -> LogCtx<ops::source::SourceAdmin> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn init() -> LogCtx<ops::init::Init> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn run() -> LogCtx<ops::run::Run> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
