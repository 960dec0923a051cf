//! Fluent builder for [`MultisigJob`]
//!
//! ```rust
//! use snowflake_safe_client::job_builder::MultisigJobBuilder;
//!
//! let job = MultisigJobBuilder::new()
//!     .job_name("weekly payroll")
//!     .schedule_cron("0 0 * * 1", Some(52), Some(0))
//!     .build();
//! assert!(job.recurring);
//! ```

use chrono::{Local, Offset};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

use crate::{
    error::{SafeError, SafeResult},
    job::MultisigJob,
    types::{FeeSource, TriggerType, RECURRING_FOREVER},
};

/// Builder for multisig jobs
#[derive(Debug, Clone, Default)]
pub struct MultisigJobBuilder {
    job: MultisigJob,
}

impl MultisigJobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue building from an existing job
    pub fn from_existing_job(job: MultisigJob) -> Self {
        Self { job }
    }

    pub fn job_name(mut self, name: impl Into<String>) -> Self {
        self.job.name = name.into();
        self
    }

    pub fn job_instructions(mut self, instructions: Vec<Instruction>) -> Self {
        self.job.instructions = instructions;
        self
    }

    /// Run once at `execution_time` (unix seconds)
    pub fn schedule_once(mut self, execution_time: i64) -> Self {
        self.job.trigger_type = TriggerType::Time;
        self.job.recurring = false;
        self.job.next_execution_time = execution_time;
        self
    }

    /// Run on a cron schedule
    ///
    /// # Arguments
    /// * `cron` - Cron expression
    /// * `number_of_executions` - Run count, `None` runs forever
    /// * `user_utc_offset` - Offset in seconds (positive west of UTC), `None` uses the local zone
    pub fn schedule_cron(
        mut self,
        cron: impl Into<String>,
        number_of_executions: Option<i16>,
        user_utc_offset: Option<i32>,
    ) -> Self {
        self.job.trigger_type = TriggerType::Time;
        self.job.recurring = true;
        self.job.cron = cron.into();
        self.job.remaining_runs = number_of_executions.unwrap_or(RECURRING_FOREVER);
        self.job.user_utc_offset = user_utc_offset.unwrap_or_else(local_utc_offset);
        self
    }

    /// Run whenever the program condition holds, at most `number_of_executions` times
    pub fn schedule_conditional(mut self, number_of_executions: i16) -> Self {
        self.job.trigger_type = TriggerType::ProgramCondition;
        self.job.remaining_runs = number_of_executions;
        self
    }

    pub fn schedule_end_date(mut self, end_date: i64) -> Self {
        self.job.schedule_end_date = end_date;
        self
    }

    pub fn expire_on_complete(mut self, expire: bool) -> Self {
        self.job.expire_on_complete = expire;
        self
    }

    /// Pay execution fees from the flow account instead of the fee account
    pub fn self_funded(mut self, is_self_funded: bool) -> Self {
        if is_self_funded {
            self.job.pay_fee_from = FeeSource::SelfFunded;
        } else {
            self.job.pay_fee_from = FeeSource::FeeAccount;
            self.job.initial_fund = 0;
        }
        self
    }

    /// Lamports to fund the flow with; requires [`self_funded(true)`](Self::self_funded)
    pub fn initial_fund(mut self, lamports: u64) -> SafeResult<Self> {
        if self.job.pay_fee_from != FeeSource::SelfFunded {
            return Err(SafeError::NotSelfFunded);
        }
        self.job.initial_fund = lamports;
        Ok(self)
    }

    pub fn client_app_id(mut self, app_id: u32) -> Self {
        self.job.client_app_id = app_id;
        self
    }

    pub fn dedicated_operator(mut self, operator: Pubkey) -> Self {
        self.job.dedicated_operator = operator;
        self
    }

    pub fn extra(mut self, extra: impl Into<String>) -> Self {
        self.job.extra = extra.into();
        self
    }

    pub fn build(self) -> MultisigJob {
        self.job
    }
}

/// Local zone offset in seconds, positive west of UTC
fn local_utc_offset() -> i32 {
    -Local::now().offset().fix().local_minus_utc()
}
