// src/services/whatsapp_service.rs

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use sqlx::{PgConnection, PgPool};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{begin_tenant_tx, RlsTx},
        error::AppError,
    },
    db::{ClientRepository, IntegrationRepository, MarketingRepository, WhatsAppRepository},
    models::{
        integrations::Provider,
        marketing::CampaignStatus,
        whatsapp::{
            BulkProgress, BulkSendPayload, BulkSendResponse, MessageKind, MessageStatus, Recipient,
            SendMessagePayload, WhatsAppMessage,
        },
    },
    services::integrations::{HttpWhatsAppGateway, IntegrationError, MessageGateway},
};

// Intervalo aleatório entre dois envios do disparo em massa
pub const MIN_DELAY_MS: u64 = 3_000;
pub const MAX_DELAY_MS: u64 = 7_000;

pub fn random_delay() -> Duration {
    Duration::from_millis(rand::rng().random_range(MIN_DELAY_MS..=MAX_DELAY_MS))
}

/// Só dígitos; números nacionais (DDD + número) ganham o 55 na frente.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        10 | 11 => Some(format!("55{}", digits)),
        12 | 13 if digits.starts_with("55") => Some(digits),
        _ => None,
    }
}

/// Troca o marcador `{nome}` pelo nome da cliente
pub fn render_template(template: &str, name: Option<&str>) -> String {
    template.replace("{nome}", name.map(str::trim).unwrap_or(""))
}

// =========================================================================
//  DISPARO EM MASSA
// =========================================================================

/// Espera entre envios. Em produção dorme de verdade; nos testes só anota.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// Resultado de um envio, entregue ao observador logo depois de acontecer
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub phone: String,
    pub message: String,
    pub error: Option<String>,
}

#[async_trait]
pub trait BulkObserver: Send + Sync {
    async fn on_sent(&self, outcome: &SendOutcome, progress: BulkProgress);
}

/// Envia uma mensagem por vez, com pausa aleatória entre elas.
/// Falha de um destinatário conta como erro e o laço segue.
pub struct BulkSender<G, P> {
    gateway: G,
    pacer: P,
    progress: watch::Sender<BulkProgress>,
}

impl<G: MessageGateway, P: Pacer> BulkSender<G, P> {
    pub fn new(gateway: G, pacer: P, progress: watch::Sender<BulkProgress>) -> Self {
        Self { gateway, pacer, progress }
    }

    pub async fn run(&self, recipients: &[Recipient], template: &str, observer: &dyn BulkObserver) -> BulkProgress {
        let mut progress = BulkProgress { total: recipients.len(), ..Default::default() };
        self.progress.send_replace(progress);

        for (i, recipient) in recipients.iter().enumerate() {
            if i > 0 {
                self.pacer.pause(random_delay()).await;
            }

            let message = render_template(template, recipient.name.as_deref());
            let result = match normalize_phone(&recipient.phone) {
                Some(phone) => self
                    .gateway
                    .send_text(&phone, &message)
                    .await
                    .map(|_| phone)
                    .map_err(|e| e.to_string()),
                None => Err(format!("telefone inválido: {}", recipient.phone)),
            };

            progress.processed += 1;
            let outcome = match result {
                Ok(phone) => {
                    progress.success += 1;
                    SendOutcome { phone, message, error: None }
                }
                Err(error) => {
                    progress.errors += 1;
                    tracing::warn!("⚠️ Falha no envio para {}: {}", recipient.phone, error);
                    SendOutcome { phone: recipient.phone.clone(), message, error: Some(error) }
                }
            };

            self.progress.send_replace(progress);
            observer.on_sent(&outcome, progress).await;
        }

        progress
    }
}

// Grava cada envio em whatsapp_messages e o progresso na campanha
struct CampaignRecorder {
    pool: PgPool,
    tenant_id: Uuid,
    campaign_id: Uuid,
    whatsapp_repo: WhatsAppRepository,
    marketing_repo: MarketingRepository,
}

impl CampaignRecorder {
    async fn record(&self, outcome: &SendOutcome, progress: BulkProgress) -> Result<(), AppError> {
        let mut tx = begin_tenant_tx(&self.pool, self.tenant_id).await?;
        let status = if outcome.error.is_some() { MessageStatus::Erro } else { MessageStatus::Enviada };

        self.whatsapp_repo
            .log_message(
                &mut *tx,
                self.tenant_id,
                Some(self.campaign_id),
                &outcome.phone,
                &outcome.message,
                MessageKind::Text,
                status,
                outcome.error.as_deref(),
            )
            .await?;
        self.marketing_repo
            .update_campaign_progress(&mut *tx, self.campaign_id, &progress)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn finish(&self, progress: BulkProgress) -> Result<(), AppError> {
        let status = if !progress.is_done() || (progress.total > 0 && progress.success == 0) {
            CampaignStatus::Falhou
        } else {
            CampaignStatus::Concluida
        };
        let mut tx = begin_tenant_tx(&self.pool, self.tenant_id).await?;
        self.marketing_repo.finish_campaign(&mut *tx, self.campaign_id, status).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl BulkObserver for CampaignRecorder {
    async fn on_sent(&self, outcome: &SendOutcome, progress: BulkProgress) {
        if let Err(e) = self.record(outcome, progress).await {
            tracing::warn!("⚠️ Não foi possível registrar o envio da campanha {}: {}", self.campaign_id, e);
        }
    }
}

// =========================================================================
//  SERVIÇO
// =========================================================================

#[derive(Clone)]
pub struct WhatsAppService {
    pool: PgPool,
    http: reqwest::Client,
    integration_repo: IntegrationRepository,
    whatsapp_repo: WhatsAppRepository,
    marketing_repo: MarketingRepository,
    client_repo: ClientRepository,
}

impl WhatsAppService {
    pub fn new(
        pool: PgPool,
        http: reqwest::Client,
        integration_repo: IntegrationRepository,
        whatsapp_repo: WhatsAppRepository,
        marketing_repo: MarketingRepository,
        client_repo: ClientRepository,
    ) -> Self {
        Self { pool, http, integration_repo, whatsapp_repo, marketing_repo, client_repo }
    }

    /// Monta o gateway com as credenciais da loja (apiUrl, token, instance)
    pub async fn gateway_for(&self, conn: &mut PgConnection, tenant_id: Uuid) -> Result<HttpWhatsAppGateway, AppError> {
        let integration = self
            .integration_repo
            .find(&mut *conn, tenant_id, Provider::Whatsapp)
            .await?
            .filter(|i| i.is_active)
            .ok_or(AppError::IntegrationNotConfigured("WhatsApp"))?;

        match (
            integration.credential("apiUrl"),
            integration.credential("token"),
            integration.credential("instance"),
        ) {
            (Some(url), Some(token), Some(instance)) => {
                Ok(HttpWhatsAppGateway::new(self.http.clone(), url, token, instance))
            }
            _ => Err(AppError::IntegrationNotConfigured("WhatsApp")),
        }
    }

    /// Envio avulso. A mensagem fica no histórico mesmo quando falha.
    /// O gateway vem resolvido de antes: nenhuma conexão fica presa
    /// esperando a resposta do provedor.
    pub async fn send_message<G: MessageGateway>(
        &self,
        gateway: &G,
        tenant_id: Uuid,
        payload: &SendMessagePayload,
    ) -> Result<WhatsAppMessage, AppError> {
        let phone = normalize_phone(&payload.phone)
            .ok_or_else(|| AppError::InvalidField(format!("Telefone inválido: {}", payload.phone)))?;

        let result = gateway.send_text(&phone, &payload.message).await;
        self.log(tenant_id, &phone, &payload.message, MessageKind::Text, result).await
    }

    /// Envia um arquivo (o PDF do romaneio) em base64
    pub async fn send_file<G: MessageGateway>(
        &self,
        gateway: &G,
        tenant_id: Uuid,
        raw_phone: &str,
        file_name: &str,
        base64: &str,
        caption: Option<&str>,
    ) -> Result<WhatsAppMessage, AppError> {
        let phone = normalize_phone(raw_phone)
            .ok_or_else(|| AppError::InvalidField(format!("Telefone inválido: {}", raw_phone)))?;

        let result = gateway.send_file(&phone, file_name, base64, caption).await;
        let description = caption.unwrap_or(file_name);
        self.log(tenant_id, &phone, description, MessageKind::File, result).await
    }

    // Grava no histórico numa transação curta, aberta só depois do envio
    async fn log(
        &self,
        tenant_id: Uuid,
        phone: &str,
        message: &str,
        kind: MessageKind,
        result: Result<(), IntegrationError>,
    ) -> Result<WhatsAppMessage, AppError> {
        let (status, error) = match &result {
            Ok(()) => (MessageStatus::Enviada, None),
            Err(e) => {
                tracing::warn!("⚠️ Falha no envio de WhatsApp para {}: {}", phone, e);
                (MessageStatus::Erro, Some(e.to_string()))
            }
        };

        let mut tx = begin_tenant_tx(&self.pool, tenant_id).await?;
        let logged = self
            .whatsapp_repo
            .log_message(&mut *tx, tenant_id, None, phone, message, kind, status, error.as_deref())
            .await?;
        tx.commit().await?;
        Ok(logged)
    }

    /// Mensagem do sistema (código de recuperação de senha). Sem gateway
    /// configurado a loja não recebe nada e a falha fica só no log.
    pub async fn send_system_message(&self, tenant_id: Uuid, phone: &str, text: &str) -> Result<(), AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id).await?;
        let gateway = self.gateway_for(&mut *tx, tenant_id).await?;
        tx.commit().await?;

        let payload = SendMessagePayload { phone: phone.to_string(), message: text.to_string() };
        let logged = self.send_message(&gateway, tenant_id, &payload).await?;

        if logged.status == MessageStatus::Erro {
            return Err(AppError::BusinessRule(logged.error.unwrap_or_default()));
        }
        Ok(())
    }

    pub async fn list_messages(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        campaign_id: Option<Uuid>,
    ) -> Result<Vec<WhatsAppMessage>, AppError> {
        self.whatsapp_repo.list_messages(conn, tenant_id, campaign_id).await
    }

    /// Cria a campanha, confirma a transação e dispara em segundo plano.
    /// O progresso fica em marketing_campaigns, atualizado a cada envio.
    pub async fn start_bulk(
        &self,
        mut tx: RlsTx,
        tenant_id: Uuid,
        payload: BulkSendPayload,
    ) -> Result<BulkSendResponse, AppError> {
        let gateway = self.gateway_for(&mut *tx, tenant_id).await?;

        let recipients = if payload.recipients.is_empty() {
            self.client_repo
                .list_active(&mut *tx, tenant_id)
                .await?
                .into_iter()
                .map(|c| Recipient { phone: c.phone, name: Some(c.name) })
                .collect()
        } else {
            payload.recipients
        };

        if recipients.is_empty() {
            return Err(AppError::BusinessRule("Nenhuma destinatária para o disparo.".into()));
        }

        let campaign = self
            .marketing_repo
            .create_campaign(&mut *tx, tenant_id, &payload.campaign_name, &payload.message, recipients.len() as i32)
            .await?;
        tx.commit().await?;

        let total_recipients = recipients.len();
        let recorder = CampaignRecorder {
            pool: self.pool.clone(),
            tenant_id,
            campaign_id: campaign.id,
            whatsapp_repo: self.whatsapp_repo.clone(),
            marketing_repo: self.marketing_repo.clone(),
        };
        let template = payload.message;

        tracing::info!("📣 Campanha {} iniciada para {} destinatárias", campaign.id, total_recipients);

        tokio::spawn(async move {
            let (progress_tx, _progress_rx) = watch::channel(BulkProgress::default());
            let sender = BulkSender::new(gateway, TokioPacer, progress_tx);
            let progress = sender.run(&recipients, &template, &recorder).await;

            if let Err(e) = recorder.finish(progress).await {
                tracing::error!("🔥 Falha ao encerrar a campanha {}: {:?}", recorder.campaign_id, e);
            }
            tracing::info!(
                "✅ Campanha {} concluída: {} enviadas, {} erros",
                recorder.campaign_id,
                progress.success,
                progress.errors
            );
        });

        Ok(BulkSendResponse { campaign_id: campaign.id, total_recipients })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    // Anota a pausa pedida sem dormir
    #[derive(Clone, Default)]
    struct RecordingPacer {
        pauses: Arc<Mutex<Vec<Duration>>>,
    }

    #[async_trait]
    impl Pacer for RecordingPacer {
        async fn pause(&self, duration: Duration) {
            self.pauses.lock().unwrap().push(duration);
        }
    }

    // Gateway falso: guarda o progresso visto no momento de cada envio
    struct FakeGateway {
        progress: watch::Receiver<BulkProgress>,
        seen_processed: Arc<Mutex<Vec<usize>>>,
        sent: Arc<Mutex<Vec<(String, String)>>>,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl MessageGateway for FakeGateway {
        async fn send_text(&self, phone: &str, text: &str) -> Result<(), IntegrationError> {
            self.seen_processed.lock().unwrap().push(self.progress.borrow().processed);
            if self.fail_for.as_deref() == Some(phone) {
                return Err(IntegrationError::Api { status: 500, message: "instance offline".into() });
            }
            self.sent.lock().unwrap().push((phone.to_string(), text.to_string()));
            Ok(())
        }

        async fn send_file(&self, _: &str, _: &str, _: &str, _: Option<&str>) -> Result<(), IntegrationError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        outcomes: Mutex<Vec<(SendOutcome, BulkProgress)>>,
    }

    #[async_trait]
    impl BulkObserver for RecordingObserver {
        async fn on_sent(&self, outcome: &SendOutcome, progress: BulkProgress) {
            self.outcomes.lock().unwrap().push((outcome.clone(), progress));
        }
    }

    fn recipients(n: usize) -> Vec<Recipient> {
        (0..n)
            .map(|i| Recipient { phone: format!("119876543{:02}", i), name: Some(format!("Cliente {}", i)) })
            .collect()
    }

    struct Harness {
        sender: BulkSender<FakeGateway, RecordingPacer>,
        pacer: RecordingPacer,
        progress: watch::Receiver<BulkProgress>,
        seen_processed: Arc<Mutex<Vec<usize>>>,
        sent: Arc<Mutex<Vec<(String, String)>>>,
    }

    fn harness(fail_for: Option<&str>) -> Harness {
        let (tx, rx) = watch::channel(BulkProgress::default());
        let seen_processed = Arc::new(Mutex::new(Vec::new()));
        let sent = Arc::new(Mutex::new(Vec::new()));
        let gateway = FakeGateway {
            progress: rx.clone(),
            seen_processed: seen_processed.clone(),
            sent: sent.clone(),
            fail_for: fail_for.map(str::to_string),
        };
        let pacer = RecordingPacer::default();
        Harness {
            sender: BulkSender::new(gateway, pacer.clone(), tx),
            pacer,
            progress: rx,
            seen_processed,
            sent,
        }
    }

    #[tokio::test]
    async fn n_recipients_get_n_minus_one_pauses_in_range() {
        let h = harness(None);
        let observer = RecordingObserver::default();
        let result = h.sender.run(&recipients(5), "Olá {nome}!", &observer).await;

        let pauses = h.pacer.pauses.lock().unwrap().clone();
        assert_eq!(pauses.len(), 4);
        for pause in pauses {
            assert!(pause >= Duration::from_millis(MIN_DELAY_MS));
            assert!(pause <= Duration::from_millis(MAX_DELAY_MS));
        }
        assert_eq!(result, BulkProgress { total: 5, processed: 5, success: 5, errors: 0 });
        assert_eq!(*h.progress.borrow(), result);
    }

    #[tokio::test]
    async fn single_recipient_never_pauses() {
        let h = harness(None);
        h.sender.run(&recipients(1), "oi", &RecordingObserver::default()).await;
        assert!(h.pacer.pauses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn progress_reaches_total_only_after_last_send() {
        let h = harness(None);
        let observer = RecordingObserver::default();
        h.sender.run(&recipients(4), "oi", &observer).await;

        // No momento do envio k, só k envios anteriores tinham sido contados
        assert_eq!(*h.seen_processed.lock().unwrap(), vec![0, 1, 2, 3]);

        let processed: Vec<usize> = observer.outcomes.lock().unwrap().iter().map(|(_, p)| p.processed).collect();
        assert_eq!(processed, vec![1, 2, 3, 4]);
        assert!(h.progress.borrow().is_done());
    }

    #[tokio::test]
    async fn failures_are_counted_and_loop_continues() {
        let list = vec![
            Recipient { phone: "(11) 98765-4300".into(), name: Some("Ana".into()) },
            Recipient { phone: "123".into(), name: Some("Bia".into()) },
            Recipient { phone: "11987654302".into(), name: Some("Carla".into()) },
        ];
        let h = harness(Some("5511987654302"));
        let observer = RecordingObserver::default();
        let result = h.sender.run(&list, "Olá {nome}", &observer).await;

        assert_eq!(result, BulkProgress { total: 3, processed: 3, success: 1, errors: 2 });
        assert_eq!(*h.sent.lock().unwrap(), vec![("5511987654300".to_string(), "Olá Ana".to_string())]);
        assert_eq!(h.pacer.pauses.lock().unwrap().len(), 2);

        let outcomes = observer.outcomes.lock().unwrap();
        assert!(outcomes[0].0.error.is_none());
        assert!(outcomes[1].0.error.as_deref().unwrap().contains("telefone inválido"));
        assert!(outcomes[2].0.error.is_some());
    }

    #[test]
    fn phones_get_country_code() {
        assert_eq!(normalize_phone("(11) 98765-4321").as_deref(), Some("5511987654321"));
        assert_eq!(normalize_phone("1133334444").as_deref(), Some("551133334444"));
        assert_eq!(normalize_phone("+55 11 98765-4321").as_deref(), Some("5511987654321"));
        assert_eq!(normalize_phone("98765-4321"), None);
    }

    #[test]
    fn template_fills_name() {
        assert_eq!(render_template("Oi {nome}, chegou o catálogo!", Some(" Ana ")), "Oi Ana, chegou o catálogo!");
        assert_eq!(render_template("Oi {nome}", None), "Oi ");
    }
}
