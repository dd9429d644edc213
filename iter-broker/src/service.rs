use crate::state::BrokerState;
use iter_regbank::WriteOutcome;
use std::future;
use std::sync::Arc;
use tokio_modbus::{ExceptionCode, Request, Response};

/// A `tokio-modbus` [`Service`] over the shared [`BrokerState`]'s register
/// bank. The same service handles both the TCP listener's per-connection
/// sessions and the RTU link, since both transports address the same
/// register array (recovered from the original's single `modbus_mapping_t`
/// shared across `ctx_tcp`/`ctx_rtu`).
#[derive(Clone)]
pub struct BankService {
    state: Arc<BrokerState>,
}

impl BankService {
    pub fn new(state: Arc<BrokerState>) -> Self {
        Self { state }
    }

    /// Applies a write outcome: reconciles the parameter struct from the
    /// bank when a numeric view was touched, then re-projects so the
    /// blocks this write didn't touch stay consistent, and marks the
    /// parameter set dirty for the persister (`check_and_save_changes` in
    /// the original).
    fn reconcile(&self, outcome: WriteOutcome) {
        if outcome.view.is_some() {
            let mut bank = self.state.bank.lock().unwrap();
            let mut params = self.state.params.lock().unwrap();
            *params = bank.reflect(&params);
            bank.project(&params);
            drop(bank);
            drop(params);
            self.state.mark_dirty();
        }
    }
}

impl tokio_modbus::server::Service for BankService {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        let result = match req {
            Request::ReadHoldingRegisters(addr, count) => {
                let bank = self.state.bank.lock().unwrap();
                let start = addr as usize;
                let count = count as usize;
                if start + count > bank.len() {
                    Err(ExceptionCode::IllegalDataAddress)
                } else {
                    Ok(Response::ReadHoldingRegisters(bank.read(start, count).to_vec()))
                }
            }
            Request::WriteSingleRegister(addr, value) => {
                let outcome = {
                    let mut bank = self.state.bank.lock().unwrap();
                    bank.dispatch_write(addr as usize, &[value])
                };
                self.reconcile(outcome);
                Ok(Response::WriteSingleRegister(addr, value))
            }
            Request::WriteMultipleRegisters(addr, values) => {
                let count = values.len() as u16;
                let outcome = {
                    let mut bank = self.state.bank.lock().unwrap();
                    bank.dispatch_write(addr as usize, &values)
                };
                self.reconcile(outcome);
                Ok(Response::WriteMultipleRegisters(addr, count))
            }
            _ => Err(ExceptionCode::IllegalFunction),
        };
        future::ready(result)
    }
}
