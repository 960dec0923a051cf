//! Job ⇄ wire record conversion
//!
//! The program stores a flow as a [`SerializableJob`]. Every numeric job field is either
//! big-integer encoded ([`BigNum`]) or kept as a plain native number; the choice is fixed
//! by the field types below and listed in [`FIELD_ENCODINGS`]. The job's instructions
//! travel as [`ActionRecord`]s and its address has no wire form at all.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;

use crate::{
    action::ActionRecord,
    bignum::BigNum,
    error::SafeResult,
    job::MultisigJob,
    types::{ApprovalRecord, FeeSource, ProposalState, TriggerType},
};

/// How a job field is represented on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEncoding {
    /// Numeric, widened to [`BigNum`]
    BigInteger,
    /// Numeric or tag, kept at its native width
    Plain,
    /// Non-numeric, copied unchanged
    PassThrough,
    /// Replaced by a different wire field
    Replaced(&'static str),
    /// No wire representation
    Dropped,
}

/// Encoding of every [`MultisigJob`] field, in wire order where one exists
pub const FIELD_ENCODINGS: &[(&str, FieldEncoding)] = &[
    ("address", FieldEncoding::Dropped),
    ("requested_by", FieldEncoding::PassThrough),
    ("safe", FieldEncoding::PassThrough),
    ("owner_set_seq", FieldEncoding::Plain),
    ("approvals", FieldEncoding::PassThrough),
    ("proposal_stage", FieldEncoding::Plain),
    ("name", FieldEncoding::PassThrough),
    ("instructions", FieldEncoding::Replaced("actions")),
    ("trigger_type", FieldEncoding::Plain),
    ("recurring", FieldEncoding::PassThrough),
    ("next_execution_time", FieldEncoding::BigInteger),
    ("cron", FieldEncoding::PassThrough),
    ("remaining_runs", FieldEncoding::Plain),
    ("user_utc_offset", FieldEncoding::Plain),
    ("schedule_end_date", FieldEncoding::BigInteger),
    ("expire_on_complete", FieldEncoding::PassThrough),
    ("retry_window", FieldEncoding::Plain),
    ("client_app_id", FieldEncoding::Plain),
    ("pay_fee_from", FieldEncoding::Plain),
    ("initial_fund", FieldEncoding::BigInteger),
    ("last_scheduled_execution", FieldEncoding::BigInteger),
    ("created_date", FieldEncoding::BigInteger),
    ("last_updated_date", FieldEncoding::BigInteger),
    ("dedicated_operator", FieldEncoding::PassThrough),
    ("extra", FieldEncoding::PassThrough),
];

/// Look up the wire encoding of a job field
pub fn field_encoding(field: &str) -> Option<FieldEncoding> {
    FIELD_ENCODINGS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, encoding)| *encoding)
}

/// Flow record as stored on-chain (after the 8-byte discriminator)
///
/// `requested_by` and `safe` lead the layout; the safe filter used by
/// [`crate::accounts::FLOW_SAFE_OFFSET`] depends on it.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SerializableJob {
    pub requested_by: Pubkey,
    pub safe: Pubkey,
    pub owner_set_seqno: u32,
    pub approvals: Vec<ApprovalRecord>,
    pub proposal_state: u8,
    pub name: String,
    pub actions: Vec<ActionRecord>,
    pub trigger_type: u8,
    pub recurring: bool,
    pub next_execution_time: BigNum<i64>,
    pub cron: String,
    pub remaining_runs: i16,
    pub user_utc_offset: i32,
    pub schedule_end_date: BigNum<i64>,
    pub expire_on_complete: bool,
    pub retry_window: u32,
    pub client_app_id: u32,
    pub pay_fee_from: u8,
    pub initial_fund: BigNum<u64>,
    pub last_scheduled_execution: BigNum<i64>,
    pub created_date: BigNum<i64>,
    pub last_updated_date: BigNum<i64>,
    pub dedicated_operator: Pubkey,
    pub extra: String,
}

impl SerializableJob {
    /// Build the wire record for a job
    pub fn from_job(job: &MultisigJob) -> Self {
        Self {
            requested_by: job.requested_by,
            safe: job.safe,
            owner_set_seqno: job.owner_set_seq,
            approvals: job.approvals.clone(),
            proposal_state: job.proposal_stage as u8,
            name: job.name.clone(),
            actions: job.instructions.iter().map(ActionRecord::from_instruction).collect(),
            trigger_type: job.trigger_type as u8,
            recurring: job.recurring,
            next_execution_time: BigNum::new(job.next_execution_time),
            cron: job.cron.clone(),
            remaining_runs: job.remaining_runs,
            user_utc_offset: job.user_utc_offset,
            schedule_end_date: BigNum::new(job.schedule_end_date),
            expire_on_complete: job.expire_on_complete,
            retry_window: job.retry_window,
            client_app_id: job.client_app_id,
            pay_fee_from: job.pay_fee_from as u8,
            initial_fund: BigNum::new(job.initial_fund),
            last_scheduled_execution: BigNum::new(job.last_scheduled_execution),
            created_date: BigNum::new(job.created_date),
            last_updated_date: BigNum::new(job.last_updated_date),
            dedicated_operator: job.dedicated_operator,
            extra: job.extra.clone(),
        }
    }

    /// Rebuild the job stored at `address`
    pub fn into_job(self, address: Pubkey) -> SafeResult<MultisigJob> {
        Ok(MultisigJob {
            address: Some(address),
            name: self.name,
            instructions: self.actions.iter().map(ActionRecord::to_instruction).collect(),
            trigger_type: TriggerType::try_from(self.trigger_type)?,
            recurring: self.recurring,
            next_execution_time: self.next_execution_time.narrow("next_execution_time")?,
            cron: self.cron,
            remaining_runs: self.remaining_runs,
            user_utc_offset: self.user_utc_offset,
            schedule_end_date: self.schedule_end_date.narrow("schedule_end_date")?,
            expire_on_complete: self.expire_on_complete,
            retry_window: self.retry_window,
            pay_fee_from: FeeSource::try_from(self.pay_fee_from)?,
            initial_fund: self.initial_fund.narrow("initial_fund")?,
            client_app_id: self.client_app_id,
            dedicated_operator: self.dedicated_operator,
            requested_by: self.requested_by,
            created_date: self.created_date.narrow("created_date")?,
            last_updated_date: self.last_updated_date.narrow("last_updated_date")?,
            last_scheduled_execution: self
                .last_scheduled_execution
                .narrow("last_scheduled_execution")?,
            extra: self.extra,
            safe: self.safe,
            owner_set_seq: self.owner_set_seqno,
            approvals: self.approvals,
            proposal_stage: ProposalState::try_from(self.proposal_state)?,
        })
    }
}

/// Convert a job to its wire record
pub fn to_wire(job: &MultisigJob) -> SerializableJob {
    SerializableJob::from_job(job)
}

/// Convert a fetched wire record back to a job living at `address`
pub fn from_wire(record: SerializableJob, address: Pubkey) -> SafeResult<MultisigJob> {
    record.into_job(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::SafeError,
        job_builder::MultisigJobBuilder,
        types::RECURRING_FOREVER,
    };
    use ethnum::I256;
    use solana_sdk::instruction::{AccountMeta, Instruction};

    fn representative_job() -> MultisigJob {
        let instructions = vec![
            Instruction {
                program_id: Pubkey::new_unique(),
                accounts: vec![
                    AccountMeta::new(Pubkey::new_unique(), true),
                    AccountMeta::new_readonly(Pubkey::new_unique(), false),
                ],
                data: vec![1, 2, 3, 4],
            },
            Instruction {
                program_id: Pubkey::new_unique(),
                accounts: vec![],
                data: vec![],
            },
        ];
        let mut job = MultisigJobBuilder::new()
            .job_name("payroll")
            .job_instructions(instructions)
            .schedule_cron("0 0 * * *", None, Some(-7200))
            .schedule_end_date(i64::MAX - 1)
            .expire_on_complete(true)
            .self_funded(true)
            .initial_fund(u64::MAX - 3)
            .unwrap()
            .client_app_id(12)
            .dedicated_operator(Pubkey::new_unique())
            .extra("{\"memo\":true}")
            .build();
        job.next_execution_time = (1i64 << 53) + 1;
        job.last_scheduled_execution = -1;
        job.created_date = 1_650_000_000;
        job.last_updated_date = 1_650_000_123;
        job.requested_by = Pubkey::new_unique();
        job.safe = Pubkey::new_unique();
        job.owner_set_seq = 3;
        job.approvals = vec![
            ApprovalRecord::new(Pubkey::new_unique(), true),
            ApprovalRecord::new(Pubkey::new_unique(), false),
        ];
        job.proposal_stage = ProposalState::ExecutionInProgress;
        job
    }

    #[test]
    fn test_round_trip_field_by_field() {
        let address = Pubkey::new_unique();
        let mut job = representative_job();
        job.address = Some(address);

        let restored = from_wire(to_wire(&job), address).unwrap();

        assert_eq!(restored.address, Some(address));
        assert_eq!(restored.name, job.name);
        assert_eq!(restored.instructions, job.instructions);
        assert_eq!(restored.trigger_type, job.trigger_type);
        assert_eq!(restored.recurring, job.recurring);
        assert_eq!(restored.next_execution_time, (1i64 << 53) + 1);
        assert_eq!(restored.cron, job.cron);
        assert_eq!(restored.remaining_runs, RECURRING_FOREVER);
        assert_eq!(restored.user_utc_offset, -7200);
        assert_eq!(restored.schedule_end_date, i64::MAX - 1);
        assert_eq!(restored.expire_on_complete, job.expire_on_complete);
        assert_eq!(restored.retry_window, job.retry_window);
        assert_eq!(restored.pay_fee_from, FeeSource::SelfFunded);
        assert_eq!(restored.initial_fund, u64::MAX - 3);
        assert_eq!(restored.client_app_id, 12);
        assert_eq!(restored.dedicated_operator, job.dedicated_operator);
        assert_eq!(restored.requested_by, job.requested_by);
        assert_eq!(restored.created_date, job.created_date);
        assert_eq!(restored.last_updated_date, job.last_updated_date);
        assert_eq!(restored.last_scheduled_execution, -1);
        assert_eq!(restored.extra, job.extra);
        assert_eq!(restored.safe, job.safe);
        assert_eq!(restored.owner_set_seq, 3);
        assert_eq!(restored.approvals, job.approvals);
        assert_eq!(restored.proposal_stage, ProposalState::ExecutionInProgress);
        assert_eq!(restored, job);
    }

    #[test]
    fn test_round_trip_through_borsh() {
        let address = Pubkey::new_unique();
        let mut job = representative_job();
        job.address = Some(address);

        let bytes = borsh::to_vec(&to_wire(&job)).unwrap();
        let record: SerializableJob = borsh::from_slice(&bytes).unwrap();
        assert_eq!(from_wire(record, address).unwrap(), job);
    }

    #[test]
    fn test_address_is_dropped_and_instructions_replaced() {
        let mut job = representative_job();
        job.address = Some(Pubkey::new_unique());

        let with_address = to_wire(&job);
        job.address = None;
        assert_eq!(to_wire(&job), with_address);
        assert_eq!(with_address.actions.len(), job.instructions.len());
        assert_eq!(with_address.actions[0].to_instruction(), job.instructions[0]);
    }

    #[test]
    fn test_big_integer_fields_are_wide() {
        let job = representative_job();
        let record = to_wire(&job);
        assert_eq!(record.initial_fund.value(), I256::from(u64::MAX - 3));
        assert_eq!(record.next_execution_time.value(), I256::from((1i64 << 53) + 1));
    }

    #[test]
    fn test_plain_fields_match_exclusion_set() {
        let plain: Vec<&str> = FIELD_ENCODINGS
            .iter()
            .filter(|(_, encoding)| *encoding == FieldEncoding::Plain)
            .map(|(name, _)| *name)
            .collect();
        assert_eq!(
            plain,
            vec![
                "owner_set_seq",
                "proposal_stage",
                "trigger_type",
                "remaining_runs",
                "user_utc_offset",
                "retry_window",
                "client_app_id",
                "pay_fee_from",
            ]
        );
        assert_eq!(field_encoding("address"), Some(FieldEncoding::Dropped));
        assert_eq!(
            field_encoding("instructions"),
            Some(FieldEncoding::Replaced("actions"))
        );
        assert_eq!(field_encoding("initial_fund"), Some(FieldEncoding::BigInteger));
        assert_eq!(field_encoding("unknown"), None);
    }

    #[test]
    fn test_out_of_range_wire_value_rejected() {
        let mut record = to_wire(&representative_job());
        record.created_date = BigNum::from_wide(I256::from(u64::MAX));
        let err = from_wire(record, Pubkey::new_unique()).unwrap_err();
        assert!(matches!(
            err,
            SafeError::NumericOverflow { field: "created_date", .. }
        ));
    }

    #[test]
    fn test_unknown_stage_rejected() {
        let mut record = to_wire(&representative_job());
        record.proposal_state = 42;
        assert!(matches!(
            from_wire(record, Pubkey::new_unique()),
            Err(SafeError::InvalidAccountData(_))
        ));
    }
}
