// src/common/pix.rs
//
// Payload "Pix Copia e Cola" (BR Code, padrão EMV TLV) e CRC16/CCITT-FALSE.

use image::Luma;
use qrcode::QrCode;
use rust_decimal::Decimal;
use unicode_normalization::UnicodeNormalization;

use crate::common::error::AppError;

pub const MAX_NAME_LEN: usize = 25;
pub const MAX_CITY_LEN: usize = 15;
pub const MAX_TXID_LEN: usize = 25;
// Campo 26 (GUI + chave) não passa de 99 caracteres
pub const MAX_KEY_LEN: usize = 77;

const GUI_PIX: &str = "br.gov.bcb.pix";

/// CRC16/CCITT-FALSE: poly 0x1021, init 0xFFFF, sem reflexão, xorout 0.
pub fn crc16_ccitt_false(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Remove acentos (NFD sem marcas combinantes) e qualquer caractere não-ASCII.
pub fn strip_diacritics(input: &str) -> String {
    input
        .nfd()
        .filter(|c| c.is_ascii())
        .collect()
}

fn sanitize_field(input: &str, max_len: usize) -> String {
    strip_diacritics(input.trim()).chars().take(max_len).collect::<String>().trim_end().to_string()
}

fn sanitize_txid(input: Option<&str>) -> String {
    let txid: String = input
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MAX_TXID_LEN)
        .collect();
    if txid.is_empty() { "***".to_string() } else { txid }
}

fn tlv(id: &str, value: &str) -> String {
    format!("{}{:02}{}", id, value.len(), value)
}

#[derive(Debug, Clone)]
pub struct PixPayload {
    pub key: String,
    pub name: String,
    pub city: String,
    pub amount: Option<Decimal>,
    pub txid: Option<String>,
    pub description: Option<String>,
}

impl PixPayload {
    pub fn new(key: impl Into<String>, name: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            city: city.into(),
            amount: None,
            txid: None,
            description: None,
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_txid(mut self, txid: impl Into<String>) -> Self {
        self.txid = Some(txid.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Monta o BR Code completo, já com o CRC no final.
    pub fn encode(&self) -> Result<String, AppError> {
        let key = self.key.trim();
        if key.is_empty() {
            return Err(AppError::PixInvalid("chave PIX vazia".into()));
        }
        if !key.is_ascii() || key.len() > MAX_KEY_LEN {
            return Err(AppError::PixInvalid(format!(
                "chave PIX deve ter até {} caracteres ASCII",
                MAX_KEY_LEN
            )));
        }

        let name = sanitize_field(&self.name, MAX_NAME_LEN);
        if name.is_empty() {
            return Err(AppError::PixInvalid("nome do beneficiário vazio".into()));
        }

        let city = sanitize_field(&self.city, MAX_CITY_LEN);
        if city.is_empty() {
            return Err(AppError::PixInvalid("cidade vazia".into()));
        }

        let mut account = tlv("00", GUI_PIX) + &tlv("01", key);
        if let Some(desc) = self.description.as_deref() {
            // 99 é o máximo que cabe no campo 26 junto com GUI e chave
            let room = 99usize.saturating_sub(account.len() + 4);
            let desc: String = strip_diacritics(desc.trim()).chars().take(room).collect();
            if !desc.is_empty() {
                account += &tlv("02", &desc);
            }
        }

        let mut payload = String::new();
        payload += &tlv("00", "01");
        payload += &tlv("26", &account);
        payload += &tlv("52", "0000");
        payload += &tlv("53", "986");
        if let Some(amount) = self.amount.filter(|a| *a > Decimal::ZERO) {
            payload += &tlv("54", &format!("{:.2}", amount.round_dp(2)));
        }
        payload += &tlv("58", "BR");
        payload += &tlv("59", &name);
        payload += &tlv("60", &city);
        payload += &tlv("62", &tlv("05", &sanitize_txid(self.txid.as_deref())));

        // O CRC cobre tudo, inclusive o cabeçalho "6304"
        payload += "6304";
        let crc = crc16_ccitt_false(payload.as_bytes());
        payload += &format!("{:04X}", crc);

        Ok(payload)
    }
}

/// Confere se os 4 últimos caracteres batem com o CRC do restante.
#[cfg(test)]
pub fn verify_checksum(payload: &str) -> bool {
    if payload.len() < 4 || !payload.is_ascii() {
        return false;
    }
    let (body, crc) = payload.split_at(payload.len() - 4);
    format!("{:04X}", crc16_ccitt_false(body.as_bytes())) == crc
}

/// QR Code do payload como imagem (usada no PDF do romaneio).
pub fn render_qr_image(payload: &str) -> Result<image::DynamicImage, AppError> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

    let image_buffer = code.render::<Luma<u8>>().min_dimensions(256, 256).build();
    Ok(image::DynamicImage::ImageLuma8(image_buffer))
}

/// QR Code do payload em PNG.
pub fn render_qr_png(payload: &str) -> Result<Vec<u8>, AppError> {
    let mut png = Vec::new();
    render_qr_image(payload)?
        .write_to(&mut png, image::ImageOutputFormat::Png)
        .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    #[test]
    fn crc16_reference_vectors() {
        assert_eq!(crc16_ccitt_false(b""), 0xFFFF);
        assert_eq!(crc16_ccitt_false(b"123456789"), 0x29B1);
    }

    #[test]
    fn encodes_bcb_reference_payload() {
        let payload = PixPayload::new("123e4567-e12b-12d1-a456-426655440000", "Fulano de Tal", "BRASILIA")
            .encode()
            .unwrap();

        assert_eq!(
            payload,
            "00020126580014br.gov.bcb.pix0136123e4567-e12b-12d1-a456-426655440000\
             5204000053039865802BR5913Fulano de Tal6008BRASILIA62070503***63041D3D"
        );
        assert!(verify_checksum(&payload));
    }

    #[test]
    fn amount_is_formatted_with_two_decimals() {
        let payload = PixPayload::new("artea@exemplo.com", "Artea Joias", "Sao Paulo")
            .with_amount(Decimal::from_str("150.5").unwrap())
            .with_txid("ROM-0042")
            .encode()
            .unwrap();

        assert_eq!(field_value(&payload, "54").as_deref(), Some("150.50"));
        assert_eq!(field_value(&payload, "62").as_deref(), Some("0507ROM0042"));
        assert!(verify_checksum(&payload));
    }

    #[test]
    fn zero_amount_is_omitted() {
        let payload = PixPayload::new("chave", "Nome", "Cidade")
            .with_amount(Decimal::ZERO)
            .encode()
            .unwrap();
        assert_eq!(field_value(&payload, "54"), None);
    }

    #[test]
    fn accented_fields_are_stripped_and_truncated() {
        let payload = PixPayload::new("chave", "Joalheria Ângela Conceição Ltda", "São José dos Campos")
            .encode()
            .unwrap();

        assert_eq!(field_value(&payload, "59").as_deref(), Some("Joalheria Angela Conceica"));
        assert_eq!(field_value(&payload, "60").as_deref(), Some("Sao Jose dos Ca"));
        assert!(payload.is_ascii());
    }

    #[test]
    fn tampered_payload_fails_checksum() {
        let payload = PixPayload::new("chave", "Nome", "Cidade").encode().unwrap();
        let tampered = payload.replacen("Nome", "Nomo", 1);
        assert!(!verify_checksum(&tampered));
    }

    #[test]
    fn empty_key_is_rejected_before_encoding() {
        let err = PixPayload::new("  ", "Nome", "Cidade").encode().unwrap_err();
        assert!(matches!(err, AppError::PixInvalid(_)));
    }

    #[test]
    fn longest_key_still_fits_merchant_account_field() {
        let key = "k".repeat(MAX_KEY_LEN);
        let payload = PixPayload::new(key.as_str(), "Nome", "Cidade")
            .with_description("Romaneio 12")
            .encode()
            .unwrap();

        let account = field_value(&payload, "26").unwrap();
        assert_eq!(account.len(), 99);
        assert!(account.ends_with(&key));
        assert!(verify_checksum(&payload));
    }

    #[test]
    fn oversized_or_non_ascii_key_is_rejected() {
        let long = "k".repeat(MAX_KEY_LEN + 1);
        let err = PixPayload::new(long.as_str(), "Nome", "Cidade").encode().unwrap_err();
        assert!(matches!(err, AppError::PixInvalid(_)));

        let err = PixPayload::new("joão@artea.com.br", "Nome", "Cidade").encode().unwrap_err();
        assert!(matches!(err, AppError::PixInvalid(_)));
    }

    #[test]
    fn qr_png_has_png_signature() {
        let payload = PixPayload::new("chave", "Nome", "Cidade").encode().unwrap();
        let png = render_qr_png(&payload).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    fn field_value(payload: &str, id: &str) -> Option<String> {
        let mut rest = payload;
        while rest.len() >= 4 {
            let (tag, tail) = rest.split_at(2);
            let len: usize = tail[..2].parse().ok()?;
            let value = &tail[2..2 + len];
            if tag == id {
                return Some(value.to_string());
            }
            rest = &tail[2 + len..];
        }
        None
    }

    proptest! {
        #[test]
        fn trailing_crc_matches_recomputed_checksum(
            key in "[a-z0-9@.]{1,40}",
            name in "[A-Za-zÀ-ÿ ]{1,60}",
            city in "[A-Za-zÀ-ÿ ]{1,40}",
            cents in proptest::option::of(1i64..10_000_000),
            txid in proptest::option::of("[A-Za-z0-9-]{0,40}"),
        ) {
            let mut pix = PixPayload::new(key, format!("X{}", name), format!("Y{}", city));
            if let Some(c) = cents {
                pix = pix.with_amount(Decimal::new(c, 2));
            }
            if let Some(t) = txid {
                pix = pix.with_txid(t);
            }
            let payload = pix.encode().unwrap();
            let (body, crc) = payload.split_at(payload.len() - 4);
            prop_assert_eq!(format!("{:04X}", crc16_ccitt_false(body.as_bytes())), crc);
        }

        #[test]
        fn name_and_city_respect_limits_without_diacritics(
            name in "[a-zA-ZáàâãéêíóôõúçÁÀÂÃÉÊÍÓÔÕÚÇ ]{1,80}",
            city in "[a-zA-ZáàâãéêíóôõúçÁÀÂÃÉÊÍÓÔÕÚÇ ]{1,80}",
        ) {
            let payload = PixPayload::new("chave", format!("N{}", name), format!("C{}", city))
                .encode()
                .unwrap();
            let out_name = field_value(&payload, "59").unwrap();
            let out_city = field_value(&payload, "60").unwrap();
            prop_assert!(out_name.chars().count() <= MAX_NAME_LEN);
            prop_assert!(out_city.chars().count() <= MAX_CITY_LEN);
            prop_assert!(out_name.is_ascii());
            prop_assert!(out_city.is_ascii());
        }
    }
}
