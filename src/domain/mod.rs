pub mod case;
pub mod party;
pub mod source;
pub mod transaction;

pub use case::{
    CaseRecord, CaseSnapshot, CaseTransaction, ChangeLogEntry, SaveCaseRequest, SaveCaseResponse,
    SearchParameters,
};
pub use party::{
    Address, Contact, Party, PartyAccount, PartyDescription, PartyIdentifiers, PartyName, PartyRef,
};
pub use source::{
    AbmSourceRecord, FlowOfFundsEnvelope, OlbSourceRecord, OtcSourceRecord, PosSourceRecord,
    SourceItem, SourceSystem, SourceTransactionRecord, TransferDirection, WireSourceRecord,
};
pub use transaction::{
    AccountDescriptor, CompletingAction, FlowOfFundsSummary, StartingAction, StrTransaction,
};
