// src/services/client_service.rs

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ClientRepository,
    models::{
        auth::phone_digits,
        catalog::{Client, ClientFilter, ClientPayload},
    },
};

#[derive(Clone)]
pub struct ClientService {
    client_repo: ClientRepository,
}

impl ClientService {
    pub fn new(client_repo: ClientRepository) -> Self {
        Self { client_repo }
    }

    pub async fn create_client(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        mut payload: ClientPayload,
    ) -> Result<Client, AppError> {
        normalize(&mut payload);
        self.client_repo.create_client(conn, tenant_id, None, &payload).await
    }

    pub async fn list_clients(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        filter: &ClientFilter,
    ) -> Result<Vec<Client>, AppError> {
        self.client_repo.list_clients(conn, tenant_id, filter).await
    }

    pub async fn get_client(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<Client, AppError> {
        self.client_repo
            .find_client(conn, tenant_id, id)
            .await?
            .ok_or(AppError::NotFound("Cliente"))
    }

    pub async fn update_client(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        id: Uuid,
        mut payload: ClientPayload,
    ) -> Result<Client, AppError> {
        normalize(&mut payload);
        self.client_repo
            .update_client(conn, tenant_id, id, &payload)
            .await?
            .ok_or(AppError::NotFound("Cliente"))
    }

    pub async fn deactivate_client(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        if !self.client_repo.deactivate_client(conn, tenant_id, id).await? {
            return Err(AppError::NotFound("Cliente"));
        }
        Ok(())
    }

    /// A ficha da cliente logada. Membro sem ficha não compra.
    pub async fn current_client(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Client, AppError> {
        self.client_repo
            .find_by_user(conn, tenant_id, user_id)
            .await?
            .ok_or(AppError::NotFound("Cadastro de cliente"))
    }

    /// A cliente edita os próprios dados (endereço de entrega, e-mail...)
    pub async fn update_current_client(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        user_id: Uuid,
        payload: ClientPayload,
    ) -> Result<Client, AppError> {
        let current = self.current_client(&mut *conn, tenant_id, user_id).await?;
        self.update_client(conn, tenant_id, current.id, payload).await
    }
}

// Telefone, CPF e CEP são guardados só com dígitos; UF em maiúsculas
fn normalize(payload: &mut ClientPayload) {
    payload.name = payload.name.trim().to_string();
    payload.phone = phone_digits(&payload.phone);
    payload.cpf = payload.cpf.as_deref().map(phone_digits).filter(|s| !s.is_empty());
    payload.cep = payload.cep.as_deref().map(phone_digits).filter(|s| !s.is_empty());
    payload.state = payload.state.as_deref().map(|s| s.trim().to_uppercase());
    payload.email = payload.email.as_deref().map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_payload_is_normalized() {
        let mut payload = ClientPayload {
            name: "  Ana Souza ".into(),
            phone: "(11) 98765-4321".into(),
            cpf: Some("123.456.789-09".into()),
            cep: Some("01310-100".into()),
            state: Some("sp".into()),
            email: Some(" Ana@Exemplo.com ".into()),
            ..Default::default()
        };
        normalize(&mut payload);

        assert_eq!(payload.name, "Ana Souza");
        assert_eq!(payload.phone, "11987654321");
        assert_eq!(payload.cpf.as_deref(), Some("12345678909"));
        assert_eq!(payload.cep.as_deref(), Some("01310100"));
        assert_eq!(payload.state.as_deref(), Some("SP"));
        assert_eq!(payload.email.as_deref(), Some("ana@exemplo.com"));
    }
}
