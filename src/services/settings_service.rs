// src/services/settings_service.rs

use std::path::PathBuf;

use anyhow::Context;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::SettingsRepository,
    models::settings::{AssetKind, CompanySettings, StorageBucket, UpdateSettingsRequest, UploadResponse},
};

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "svg"];

#[derive(Clone)]
pub struct SettingsService {
    repo: SettingsRepository,
    storage_dir: PathBuf,
    public_base_url: String,
}

impl SettingsService {
    pub fn new(repo: SettingsRepository, storage_dir: PathBuf, public_base_url: String) -> Self {
        Self {
            repo,
            storage_dir,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn get(&self, conn: &mut PgConnection, tenant_id: Uuid) -> Result<CompanySettings, AppError> {
        self.repo.get_settings(conn, tenant_id).await
    }

    pub async fn update(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        payload: &UpdateSettingsRequest,
    ) -> Result<CompanySettings, AppError> {
        self.repo.update_settings(conn, tenant_id, payload).await
    }

    /// Grava o arquivo em `STORAGE_DIR/<bucket>/<loja>/<arquivo>`.
    /// Logo e ícone já ficam apontados nas configurações da loja.
    pub async fn upload(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        bucket: StorageBucket,
        asset: Option<AssetKind>,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<UploadResponse, AppError> {
        if bytes.is_empty() {
            return Err(AppError::InvalidField("arquivo vazio".into()));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::InvalidField("arquivo maior que 5 MB".into()));
        }
        if asset.is_some() && bucket != StorageBucket::CompanyAssets {
            return Err(AppError::InvalidField("logo e ícone vão no bucket company-assets".into()));
        }

        let file_name = stored_file_name(Uuid::new_v4(), original_name)?;
        let path = format!("{}/{}/{}", bucket.as_str(), tenant_id, file_name);

        let dir = self.storage_dir.join(bucket.as_str()).join(tenant_id.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("criando {}", dir.display()))?;
        tokio::fs::write(dir.join(&file_name), bytes)
            .await
            .with_context(|| format!("gravando {}", path))?;

        let public_url = format!("{}/storage/{}", self.public_base_url, path);
        tracing::info!("📁 Arquivo salvo em {} ({} bytes)", path, bytes.len());

        match asset {
            Some(AssetKind::Logo) => {
                self.repo.set_asset_url(conn, tenant_id, Some(&public_url), None).await?;
            }
            Some(AssetKind::Icon) => {
                self.repo.set_asset_url(conn, tenant_id, None, Some(&public_url)).await?;
            }
            None => {}
        }

        Ok(UploadResponse { path, public_url })
    }
}

/// `<uuid>-<nome-limpo>.<ext>`: só ASCII minúsculo, dígitos e hífen
pub fn stored_file_name(id: Uuid, original: &str) -> Result<String, AppError> {
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let (stem, ext) = base
        .rsplit_once('.')
        .ok_or_else(|| AppError::InvalidField("arquivo sem extensão".into()))?;

    let ext = ext.to_ascii_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AppError::InvalidField(format!("extensão .{} não permitida", ext)));
    }

    let mut clean = String::new();
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() {
            clean.push(c.to_ascii_lowercase());
        } else if !clean.ends_with('-') {
            clean.push('-');
        }
    }
    let clean: String = clean.trim_matches('-').chars().take(40).collect();

    if clean.is_empty() {
        Ok(format!("{}.{}", id, ext))
    } else {
        Ok(format!("{}-{}.{}", id, clean, ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_name_is_sanitized() {
        let id = Uuid::nil();
        assert_eq!(
            stored_file_name(id, "Logo Nova (final).PNG").unwrap(),
            format!("{}-logo-nova-final.png", id)
        );
        assert_eq!(stored_file_name(id, "../../etc/x.jpg").unwrap(), format!("{}-x.jpg", id));
        assert_eq!(stored_file_name(id, "çã.webp").unwrap(), format!("{}.webp", id));
    }

    #[test]
    fn stored_name_rejects_unknown_extensions() {
        assert!(stored_file_name(Uuid::nil(), "script.sh").is_err());
        assert!(stored_file_name(Uuid::nil(), "sem_extensao").is_err());
    }
}
