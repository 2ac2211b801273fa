// src/services/romaneio_pdf.rs

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use genpdf::{elements, style, Alignment, Element};
use image::DynamicImage;
use rust_decimal::Decimal;

use crate::{
    common::{error::AppError, money::RomaneioTotals, pix::render_qr_image},
    models::{
        catalog::Client,
        romaneio::{Romaneio, RomaneioItem},
        settings::CompanySettings,
    },
};

const IMAGE_TIMEOUT: Duration = Duration::from_secs(10);

// Tudo o que vai impresso no romaneio
pub struct RomaneioDocument {
    pub settings: CompanySettings,
    pub romaneio: Romaneio,
    pub lot_name: String,
    pub client: Client,
    pub items: Vec<RomaneioItem>,
    // Payload "copia e cola"; sem chave PIX configurada fica None
    pub pix_payload: Option<String>,
}

#[derive(Clone)]
pub struct RomaneioPdfRenderer {
    http: reqwest::Client,
    fonts_dir: PathBuf,
}

impl RomaneioPdfRenderer {
    pub fn new(http: reqwest::Client, fonts_dir: impl Into<PathBuf>) -> Self {
        Self { http, fonts_dir: fonts_dir.into() }
    }

    pub async fn render(&self, document: RomaneioDocument) -> Result<Vec<u8>, AppError> {
        let images = self.fetch_images(&document.items).await;
        let fonts_dir = self.fonts_dir.clone();

        // O layout do genpdf é síncrono e pesado
        tokio::task::spawn_blocking(move || build_pdf(&fonts_dir, &document, &images))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task do PDF: {}", e))?
    }

    pub async fn render_base64(&self, document: RomaneioDocument) -> Result<String, AppError> {
        let bytes = self.render(document).await?;
        Ok(STANDARD.encode(bytes))
    }

    /// Baixa as fotos dos produtos. Uma foto que falha só some da linha.
    async fn fetch_images(&self, items: &[RomaneioItem]) -> HashMap<String, DynamicImage> {
        let mut images = HashMap::new();
        for url in distinct_image_urls(items) {
            match self.fetch_image(&url).await {
                Ok(img) => {
                    images.insert(url, img);
                }
                Err(e) => tracing::warn!("⚠️ Imagem do romaneio ignorada ({}): {}", url, e),
            }
        }
        images
    }

    async fn fetch_image(&self, url: &str) -> anyhow::Result<DynamicImage> {
        let bytes = self
            .http
            .get(url)
            .timeout(IMAGE_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        // O genpdf não aceita canal alfa
        let img = image::load_from_memory(&bytes)?;
        Ok(DynamicImage::ImageRgb8(img.to_rgb8()))
    }
}

fn distinct_image_urls(items: &[RomaneioItem]) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for url in items.iter().filter_map(|i| i.image_url.as_deref()) {
        if !url.is_empty() && !urls.iter().any(|u| u == url) {
            urls.push(url.to_string());
        }
    }
    urls
}

/// R$ no formato brasileiro: 1234.5 -> "R$ 1.234,50"
pub fn brl(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{}R$ {},{}", if negative { "-" } else { "" }, grouped, frac_part)
}

fn pdf_error(e: impl std::fmt::Display) -> AppError {
    AppError::InternalServerError(anyhow::Error::msg(e.to_string()))
}

fn build_pdf(
    fonts_dir: &Path,
    document: &RomaneioDocument,
    images: &HashMap<String, DynamicImage>,
) -> Result<Vec<u8>, AppError> {
    let RomaneioDocument { settings, romaneio, lot_name, client, items, pix_payload } = document;

    // Carrega a fonte da pasta configurada
    let font_family = genpdf::fonts::from_files(fonts_dir, "Roboto", None)
        .map_err(|_| AppError::FontNotFound(format!("Fonte Roboto não encontrada em {}", fonts_dir.display())))?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(format!("Romaneio #{}", romaneio.numero));
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    // --- CABEÇALHO ---
    let title_text = settings.company_name.clone().unwrap_or_else(|| "ARTEA".to_string());
    doc.push(elements::Paragraph::new(title_text).styled(style::Style::new().bold().with_font_size(18)));

    if let Some(doc_num) = &settings.document_number {
        doc.push(elements::Paragraph::new(format!("CNPJ: {}", doc_num)).styled(style::Style::new().with_font_size(10)));
    }

    doc.push(elements::Break::new(1.5));
    doc.push(
        elements::Paragraph::new(format!("ROMANEIO #{}", romaneio.numero))
            .styled(style::Style::new().bold().with_font_size(14)),
    );
    doc.push(elements::Paragraph::new(format!(
        "Catálogo: {}  |  Data: {}",
        lot_name,
        romaneio.created_at.format("%d/%m/%Y")
    )));
    doc.push(elements::Break::new(1));

    // --- DADOS DA CLIENTE ---
    let mut client_box = elements::LinearLayout::vertical();
    client_box.push(elements::Paragraph::new(format!("Cliente: {}", client.name)).styled(style::Style::new().bold()));
    client_box.push(elements::Paragraph::new(format!("Telefone: {}", client.phone)));
    if let Some(address) = client.address_line() {
        client_box.push(elements::Paragraph::new(format!("Endereço: {}", address)));
    }
    doc.push(client_box.padded(2).framed());
    doc.push(elements::Break::new(1.5));

    // --- TABELA DE ITENS ---
    // Pesos das colunas: Foto (2), Produto (4), Qtd (1), Unitário (2), Total (2)
    let mut table = elements::TableLayout::new(vec![2, 4, 1, 2, 2]);
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

    let style_bold = style::Style::new().bold();
    table
        .row()
        .element(elements::Paragraph::new("Foto").styled(style_bold))
        .element(elements::Paragraph::new("Produto").styled(style_bold))
        .element(elements::Paragraph::new("Qtd").styled(style_bold))
        .element(elements::Paragraph::new("Unitário").styled(style_bold))
        .element(elements::Paragraph::new("Total").styled(style_bold))
        .push()
        .map_err(pdf_error)?;

    for item in items {
        // Sem foto baixada a célula fica vazia, mas a linha sai
        let mut photo = elements::LinearLayout::vertical();
        if let Some(img) = item
            .image_url
            .as_ref()
            .and_then(|url| images.get(url))
            .and_then(|img| elements::Image::from_dynamic_image(img.clone()).ok())
        {
            photo.push(img.with_scale(genpdf::Scale::new(0.15, 0.15)).padded(1));
        }

        table
            .row()
            .element(photo)
            .element(elements::Paragraph::new(item.product_name.clone()))
            .element(elements::Paragraph::new(item.quantidade.to_string()))
            .element(elements::Paragraph::new(brl(item.valor_unitario)))
            .element(elements::Paragraph::new(brl(item.valor_total)))
            .push()
            .map_err(pdf_error)?;
    }

    doc.push(table);
    doc.push(elements::Break::new(1.5));

    // --- TOTAIS ---
    let totals = RomaneioTotals::from_items(items, romaneio.desconto, romaneio.frete);
    for (label, value) in [
        ("Valor Total", totals.valor_total),
        ("Desconto", totals.desconto),
        ("Frete", totals.frete),
    ] {
        let mut line = elements::Paragraph::new(format!("{}: {}", label, brl(value)));
        line.set_alignment(Alignment::Right);
        doc.push(line);
    }
    let mut total_paragraph = elements::Paragraph::new(format!("TOTAL A PAGAR: {}", brl(totals.total_a_pagar)));
    total_paragraph.set_alignment(Alignment::Right);
    doc.push(total_paragraph.styled(style::Style::new().bold().with_font_size(12)));

    // --- PAGAMENTO (PIX) ---
    if let (Some(key), Some(payload)) = (&settings.pix_key, pix_payload) {
        doc.push(elements::Break::new(2));
        doc.push(elements::Paragraph::new("PAGAMENTO VIA PIX").styled(style::Style::new().bold().with_font_size(12)));
        doc.push(elements::Paragraph::new(format!("Chave: {}", key)));
        doc.push(elements::Paragraph::new("PIX copia e cola:").styled(style::Style::new().with_font_size(9)));
        doc.push(elements::Paragraph::new(payload.clone()).styled(style::Style::new().with_font_size(7)));
        doc.push(elements::Break::new(1));

        let qr = elements::Image::from_dynamic_image(render_qr_image(payload)?)
            .map_err(pdf_error)?
            .with_scale(genpdf::Scale::new(0.5, 0.5));
        doc.push(qr);
    }

    // --- RODAPÉ ---
    if let Some(addr) = &settings.address {
        doc.push(elements::Break::new(2));
        doc.push(elements::Paragraph::new(addr.clone()).styled(style::Style::new().italic().with_font_size(8)));
    }

    // Renderiza para Buffer (Memória)
    let mut buffer = Vec::new();
    doc.render(&mut buffer).map_err(pdf_error)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::pix::{render_qr_png, PixPayload};
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn item(url: Option<String>) -> RomaneioItem {
        RomaneioItem {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            romaneio_id: Uuid::nil(),
            product_id: Uuid::new_v4(),
            product_name: "Anel Solitário".into(),
            image_url: url,
            quantidade: 1,
            valor_unitario: Decimal::new(8990, 2),
            valor_total: Decimal::new(8990, 2),
        }
    }

    #[test]
    fn brl_uses_brazilian_separators() {
        assert_eq!(brl(Decimal::new(123456, 2)), "R$ 1.234,56");
        assert_eq!(brl(Decimal::new(5, 1)), "R$ 0,50");
        assert_eq!(brl(Decimal::new(100000000, 2)), "R$ 1.000.000,00");
        assert_eq!(brl(Decimal::new(-2500, 2)), "-R$ 25,00");
    }

    #[test]
    fn image_urls_are_deduplicated() {
        let a = Some("http://img/a.png".to_string());
        let items = vec![item(a.clone()), item(None), item(a), item(Some("http://img/b.png".into()))];
        assert_eq!(distinct_image_urls(&items), vec!["http://img/a.png", "http://img/b.png"]);
    }

    #[tokio::test]
    async fn broken_image_is_skipped_and_others_are_kept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(render_qr_png("foto").unwrap()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/garbage.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not an image".to_vec()))
            .mount(&server)
            .await;

        let ok = format!("{}/ok.png", server.uri());
        let items = vec![
            item(Some(ok.clone())),
            item(Some(format!("{}/missing.png", server.uri()))),
            item(Some(format!("{}/garbage.png", server.uri()))),
        ];

        let renderer = RomaneioPdfRenderer::new(reqwest::Client::new(), "./fonts");
        let images = renderer.fetch_images(&items).await;

        assert_eq!(images.len(), 1);
        assert!(images.contains_key(&ok));
        assert!(matches!(images[&ok], DynamicImage::ImageRgb8(_)));
    }

    fn fixture_fonts() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/fonts")
    }

    fn document(items: Vec<RomaneioItem>, pix_payload: Option<String>) -> RomaneioDocument {
        let now = chrono::Utc::now();
        let romaneio = Romaneio {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            lot_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            numero: 7,
            status: crate::models::romaneio::RomaneioStatus::Pendente,
            subtotal: Decimal::new(8990, 2) * Decimal::from(items.len()),
            desconto: Decimal::new(1000, 2),
            frete: Decimal::new(2500, 2),
            total: Decimal::new(8990, 2) * Decimal::from(items.len()) + Decimal::new(1500, 2),
            coupon_code: None,
            tracking_code: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        };
        let client = Client {
            id: romaneio.client_id,
            tenant_id: Uuid::nil(),
            user_id: None,
            name: "Ana".into(),
            phone: "11987654321".into(),
            email: None,
            cpf: None,
            cep: Some("01305000".into()),
            street: Some("Rua Augusta".into()),
            number: Some("100".into()),
            complement: None,
            neighborhood: Some("Consolação".into()),
            city: Some("São Paulo".into()),
            state: Some("SP".into()),
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let mut settings = CompanySettings::empty(Uuid::nil());
        settings.company_name = Some("Artea Joias".into());
        settings.document_number = Some("12.345.678/0001-90".into());
        settings.address = Some("Rua Augusta, 100 - São Paulo/SP".into());
        if pix_payload.is_some() {
            settings.pix_key = Some("contato@artea.com.br".into());
            settings.pix_city = Some("São Paulo".into());
        }

        RomaneioDocument {
            settings,
            romaneio,
            lot_name: "Coleção Verão".into(),
            client,
            items,
            pix_payload,
        }
    }

    #[test]
    fn full_romaneio_renders_with_and_without_photos() {
        let with_photo = "http://img/anel.png".to_string();
        let items = vec![
            item(Some(with_photo.clone())),
            item(None),
            // Foto que falhou no download: a linha sai sem imagem
            item(Some("http://img/quebrada.png".into())),
        ];
        let mut images = HashMap::new();
        images.insert(with_photo, DynamicImage::ImageRgb8(image::RgbImage::new(40, 40)));

        let pix = PixPayload::new("contato@artea.com.br", "Artea Joias", "São Paulo")
            .with_amount(Decimal::new(19480, 2))
            .with_txid("ROM7")
            .encode()
            .unwrap();
        let document = document(items, Some(pix));

        let bytes = build_pdf(&fixture_fonts(), &document, &images).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn romaneio_without_pix_still_renders() {
        let document = document(vec![item(None)], None);
        let bytes = build_pdf(&fixture_fonts(), &document, &HashMap::new()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn base64_output_decodes_to_a_pdf() {
        let renderer = RomaneioPdfRenderer::new(reqwest::Client::new(), fixture_fonts());
        let encoded = renderer
            .render_base64(document(vec![item(None), item(None)], None))
            .await
            .unwrap();

        let decoded = STANDARD.decode(encoded.as_bytes()).unwrap();
        assert!(decoded.starts_with(b"%PDF"));
        assert_eq!(STANDARD.encode(&decoded), encoded);
    }

    #[test]
    fn missing_fonts_are_reported() {
        let document = document(vec![item(None)], None);
        let result = build_pdf(Path::new("/nonexistent/fonts"), &document, &HashMap::new());
        assert!(matches!(result, Err(AppError::FontNotFound(_))));
    }
}
