use super::steps;
use crate::config::{AppConfig, NetworkEndpoints, WorkflowSettings};
use crate::domain::ports::{KeyDeriverBox, LedgerConnectorBox, LedgerSession, SignerBox};
use crate::domain::request::{Holder, IssuanceRequest, ValidatedRequest};
use crate::domain::result::{IssuanceResult, StepReport, WorkflowState};
use crate::domain::transaction::{AccountId, Amount};
use crate::error::{IssuanceError, Result};
use tracing::{debug, info, instrument, warn};

/// The token issuance workflow.
///
/// `IssuanceEngine` owns the network endpoints, the timing settings and the
/// two external capabilities (ledger connector, key deriver). Each call to
/// [`IssuanceEngine::issue_token`] is an independent run with its own ledger
/// session, so one engine can serve concurrent callers.
pub struct IssuanceEngine {
    endpoints: NetworkEndpoints,
    settings: WorkflowSettings,
    connector: LedgerConnectorBox,
    keys: KeyDeriverBox,
}

/// Signing capabilities and addresses resolved before connecting.
struct Parties {
    issuer: SignerBox,
    holder: AccountId,
    /// Present when the holder must open its line before issuance.
    trust_setup: Option<(SignerBox, Amount)>,
}

/// Mutable bookkeeping of one run. Frozen into an [`IssuanceResult`] at the end.
struct WorkflowRun {
    state: WorkflowState,
    failed_at: Option<WorkflowState>,
    trust_set: Option<StepReport>,
    payment: Option<StepReport>,
    freeze: Option<StepReport>,
    error: Option<IssuanceError>,
}

impl WorkflowRun {
    fn new() -> Self {
        Self {
            state: WorkflowState::Idle,
            failed_at: None,
            trust_set: None,
            payment: None,
            freeze: None,
            error: None,
        }
    }

    fn enter(&mut self, next: WorkflowState) {
        debug!(from = ?self.state, to = ?next, "workflow transition");
        self.state = next;
    }

    fn fail(&mut self, err: IssuanceError) {
        warn!(state = ?self.state, kind = ?err.kind(), error = %err, "workflow failed");
        self.failed_at = Some(self.state);
        self.state = WorkflowState::Failed;
        self.error = Some(err);
    }

    fn failed(&self) -> bool {
        self.state == WorkflowState::Failed
    }

    fn into_result(self) -> IssuanceResult {
        IssuanceResult {
            ok: self.payment.as_ref().is_some_and(|payment| payment.ok),
            state: self.state,
            failed_at: self.failed_at,
            trust_set: self.trust_set,
            payment: self.payment,
            freeze: self.freeze,
            error_kind: self.error.as_ref().map(IssuanceError::kind),
            error_message: self.error.as_ref().map(ToString::to_string),
        }
    }
}

impl IssuanceEngine {
    /// Creates a new `IssuanceEngine`.
    ///
    /// # Arguments
    ///
    /// * `endpoints` - Node URL per network.
    /// * `settings` - Finalization deadline and related timing.
    /// * `connector` - Opens ledger sessions.
    /// * `keys` - Derives signing capabilities from credentials.
    pub fn new(
        endpoints: NetworkEndpoints,
        settings: WorkflowSettings,
        connector: LedgerConnectorBox,
        keys: KeyDeriverBox,
    ) -> Self {
        Self {
            endpoints,
            settings,
            connector,
            keys,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        connector: LedgerConnectorBox,
        keys: KeyDeriverBox,
    ) -> Self {
        Self::new(
            config.networks.clone(),
            config.workflow.clone(),
            connector,
            keys,
        )
    }

    /// Runs one issuance from validation to report.
    ///
    /// Never returns an error: every failure, including partial completion,
    /// is described by the returned [`IssuanceResult`]. The ledger session is
    /// released on every path once it has been opened.
    #[instrument(
        skip_all,
        fields(
            network = %request.network,
            currency = %request.currency_code,
            freeze = request.freeze_requested,
        )
    )]
    pub async fn issue_token(&self, request: IssuanceRequest) -> IssuanceResult {
        let mut run = WorkflowRun::new();

        let request = match request.validate() {
            Ok(request) => request,
            Err(err) => {
                run.fail(err);
                return run.into_result();
            }
        };
        let parties = match self.resolve_parties(&request).await {
            Ok(parties) => parties,
            Err(err) => {
                run.fail(err);
                return run.into_result();
            }
        };

        let endpoint = self.endpoints.resolve(request.network);
        run.enter(WorkflowState::Connecting);
        let mut session = match self.connector.connect(endpoint).await {
            Ok(session) => session,
            Err(err) => {
                run.fail(err);
                return run.into_result();
            }
        };
        debug!(endpoint, "ledger session open");

        self.run_steps(&mut run, session.as_mut(), &request, &parties)
            .await;

        if !run.failed() {
            run.enter(WorkflowState::Reporting);
        }
        if let Err(err) = session.disconnect().await {
            warn!(error = %err, "ledger session did not close cleanly");
        }
        if !run.failed() {
            run.enter(WorkflowState::Done);
        }

        let result = run.into_result();
        info!(
            ok = result.ok,
            state = ?result.state,
            partial = result.is_partial(),
            "issuance finished"
        );
        result
    }

    async fn resolve_parties(&self, request: &ValidatedRequest) -> Result<Parties> {
        let issuer = self.keys.derive_signer(&request.issuer_credential).await?;

        let (holder, trust_setup) = match &request.holder {
            Holder::Address(address) => (address.clone(), None),
            Holder::Credential {
                credential,
                trust_limit,
            } => {
                let signer = self.keys.derive_signer(credential).await?;
                let address = signer.address().clone();
                (address, trust_limit.map(|limit| (signer, limit)))
            }
        };

        if &holder == issuer.address() {
            return Err(IssuanceError::InvalidRequest(
                "issuer cannot issue to itself".to_string(),
            ));
        }

        Ok(Parties {
            issuer,
            holder,
            trust_setup,
        })
    }

    /// Strictly sequential: each step needs the ledger-visible effect of the
    /// previous one.
    async fn run_steps(
        &self,
        run: &mut WorkflowRun,
        session: &mut dyn LedgerSession,
        request: &ValidatedRequest,
        parties: &Parties,
    ) {
        let deadline = self.settings.finalization_timeout();
        let issuer = parties.issuer.as_ref();

        if let Some((holder_signer, limit)) = &parties.trust_setup {
            run.enter(WorkflowState::EstablishingTrust);
            let result = steps::establish_trust(
                session,
                holder_signer.as_ref(),
                issuer.address(),
                &request.currency,
                limit,
                deadline,
            )
            .await;
            run.trust_set = Some(StepReport::from_result(&result));
            if let Err(err) = result {
                run.fail(err);
                return;
            }
        }

        run.enter(WorkflowState::VerifyingTrust);
        if let Err(err) =
            steps::verify_trust_line(session, &parties.holder, issuer.address(), &request.currency)
                .await
        {
            run.fail(err);
            return;
        }

        run.enter(WorkflowState::Issuing);
        let result = steps::issue(
            session,
            issuer,
            &parties.holder,
            &request.currency,
            &request.amount,
            deadline,
        )
        .await;
        run.payment = Some(StepReport::from_result(&result));
        if let Err(err) = result {
            run.fail(err);
            return;
        }

        if request.freeze_requested {
            run.enter(WorkflowState::Freezing);
            let result =
                steps::freeze(session, issuer, &parties.holder, &request.currency, deadline).await;
            run.freeze = Some(StepReport::from_result(&result));
            // The payment stands either way.
            if let Err(err) = result {
                warn!(kind = ?err.kind(), error = %err, "freeze failed after payment");
            }
        }
    }
}
