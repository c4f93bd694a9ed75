//! PDF invoices for delivered orders.
//!
//! Everything printed comes from the order itself: the persisted charge
//! breakdown and the delivery details captured at placement. Nothing is
//! recomputed and nothing time-dependent is embedded, so the same order
//! always renders to the same bytes.

use bigdecimal::BigDecimal;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderStatus};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 40.0;
const ROW_HEIGHT: f32 = 18.0;
const BOTTOM_LIMIT: f32 = 110.0;

const BRAND: &str = "GRABBIE";
const TAGLINE: &str = "Grab local deals, delivered quick";
const GREEN: (f32, f32, f32) = (0.09, 0.55, 0.27);

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

// Column anchors for the items table. Numbers are right-aligned at these x.
const COL_ITEM: f32 = MARGIN + 8.0;
const COL_QTY: f32 = 330.0;
const COL_PRICE: f32 = 440.0;
const COL_TOTAL: f32 = PAGE_WIDTH - MARGIN - 8.0;

pub fn invoice_number(order: &Order) -> String {
    let simple = order.id.simple().to_string();
    format!("INV-{}", simple[simple.len() - 6..].to_uppercase())
}

fn money(value: &BigDecimal) -> String {
    format!("Rs. {}", value.with_scale(2))
}

/// The built-in PDF fonts cannot draw most non-ASCII text.
fn printable(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}

/// Rough Helvetica advance width, good enough for right alignment.
fn text_width(s: &str, size: f32) -> f32 {
    s.chars()
        .map(|c| match c {
            'i' | 'l' | 'j' | '.' | ',' | ':' | '|' | '\'' | ' ' => 0.28,
            'm' | 'w' | 'M' | 'W' => 0.83,
            c if c.is_ascii_uppercase() => 0.67,
            c if c.is_ascii_digit() => 0.556,
            _ => 0.5,
        })
        .sum::<f32>()
        * size
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

/// Accumulates drawing operations, starting a new page when the cursor runs
/// into the footer area.
struct Sheet {
    pages: Vec<Vec<Operation>>,
    current: usize,
    y: f32,
}

impl Sheet {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            current: 0,
            y: PAGE_HEIGHT,
        }
    }

    fn ops(&mut self) -> &mut Vec<Operation> {
        &mut self.pages[self.current]
    }

    /// Returns `true` when a new page had to be started.
    fn ensure_room(&mut self, needed: f32) -> bool {
        if self.y - needed >= BOTTOM_LIMIT {
            return false;
        }
        self.pages.push(Vec::new());
        self.current = self.pages.len() - 1;
        self.y = PAGE_HEIGHT - MARGIN;
        true
    }

    fn fill(&mut self, rgb: (f32, f32, f32)) {
        self.ops()
            .push(Operation::new("rg", vec![rgb.0.into(), rgb.1.into(), rgb.2.into()]));
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, rgb: (f32, f32, f32)) {
        self.ops().push(Operation::new("q", vec![]));
        self.fill(rgb);
        self.ops()
            .push(Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()]));
        self.ops().push(Operation::new("f", vec![]));
        self.ops().push(Operation::new("Q", vec![]));
    }

    fn rule(&mut self, y: f32) {
        let ops = self.ops();
        ops.push(Operation::new("w", vec![0.5_f32.into()]));
        ops.push(Operation::new("m", vec![MARGIN.into(), y.into()]));
        ops.push(Operation::new("l", vec![(PAGE_WIDTH - MARGIN).into(), y.into()]));
        ops.push(Operation::new("S", vec![]));
    }

    fn text(&mut self, font: &str, size: f32, x: f32, y: f32, s: &str) {
        let ops = self.ops();
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
        ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        ops.push(Operation::new("Tj", vec![Object::string_literal(printable(s))]));
        ops.push(Operation::new("ET", vec![]));
    }

    fn text_right(&mut self, font: &str, size: f32, right: f32, y: f32, s: &str) {
        let x = right - text_width(s, size);
        self.text(font, size, x, y, s);
    }

    fn colored_text(&mut self, rgb: (f32, f32, f32), font: &str, size: f32, x: f32, y: f32, s: &str) {
        self.ops().push(Operation::new("q", vec![]));
        self.fill(rgb);
        self.text(font, size, x, y, s);
        self.ops().push(Operation::new("Q", vec![]));
    }
}

fn header(sheet: &mut Sheet, order: &Order) {
    let band = 80.0;
    sheet.rect(0.0, PAGE_HEIGHT - band, PAGE_WIDTH, band, GREEN);
    let white = (1.0, 1.0, 1.0);
    sheet.colored_text(white, BOLD, 26.0, MARGIN, PAGE_HEIGHT - 42.0, BRAND);
    sheet.colored_text(white, REGULAR, 10.0, MARGIN, PAGE_HEIGHT - 60.0, TAGLINE);

    let number = invoice_number(order);
    let right = PAGE_WIDTH - MARGIN;
    sheet.ops().push(Operation::new("q", vec![]));
    sheet.fill(white);
    sheet.text_right(BOLD, 16.0, right, PAGE_HEIGHT - 38.0, "INVOICE");
    sheet.text_right(REGULAR, 10.0, right, PAGE_HEIGHT - 56.0, &number);
    sheet.ops().push(Operation::new("Q", vec![]));

    sheet.y = PAGE_HEIGHT - band - 30.0;
    let y = sheet.y;
    sheet.text(BOLD, 10.0, MARGIN, y, "Order ID:");
    sheet.text(REGULAR, 10.0, MARGIN + 60.0, y, &order.id.to_string());
    sheet.text(BOLD, 10.0, MARGIN, y - 15.0, "Date:");
    sheet.text(
        REGULAR,
        10.0,
        MARGIN + 60.0,
        y - 15.0,
        &order.created_at.format("%d %b %Y").to_string(),
    );
    sheet.text(BOLD, 10.0, MARGIN, y - 30.0, "Payment:");
    sheet.text(
        REGULAR,
        10.0,
        MARGIN + 60.0,
        y - 30.0,
        &order.payment_method.as_str().to_uppercase(),
    );
    sheet.y = y - 55.0;
}

fn bill_to(sheet: &mut Sheet, order: &Order) {
    let d = &order.delivery_details;
    let mut lines = vec![d.full_name.clone(), d.address_line1.clone()];
    lines.extend(d.address_line2.clone().filter(|l| !l.trim().is_empty()));
    lines.push(format!("{}, {} - {}", d.city, d.state, d.postal_code));
    lines.push(d.country.clone());
    lines.push(format!("Phone: {}", d.phone));
    lines.extend(d.email.as_ref().map(|e| format!("Email: {e}")));

    let y = sheet.y;
    sheet.colored_text(GREEN, BOLD, 11.0, MARGIN, y, "BILL TO");
    let mut y = y - 16.0;
    for line in lines {
        sheet.text(REGULAR, 10.0, MARGIN, y, &line);
        y -= 14.0;
    }
    sheet.y = y - 16.0;
}

fn table_header(sheet: &mut Sheet) {
    let y = sheet.y;
    sheet.rect(MARGIN, y - 6.0, PAGE_WIDTH - 2.0 * MARGIN, ROW_HEIGHT + 2.0, (0.92, 0.96, 0.93));
    sheet.text(BOLD, 10.0, COL_ITEM, y, "Item");
    sheet.text_right(BOLD, 10.0, COL_QTY, y, "Qty");
    sheet.text_right(BOLD, 10.0, COL_PRICE, y, "Unit Price");
    sheet.text_right(BOLD, 10.0, COL_TOTAL, y, "Total");
    sheet.y = y - ROW_HEIGHT - 4.0;
}

fn items_table(sheet: &mut Sheet, order: &Order) {
    table_header(sheet);
    for item in &order.items {
        if sheet.ensure_room(ROW_HEIGHT) {
            table_header(sheet);
        }
        let y = sheet.y;
        sheet.text(REGULAR, 10.0, COL_ITEM, y, &truncate(&item.product_name, 48));
        sheet.text_right(REGULAR, 10.0, COL_QTY, y, &item.quantity.to_string());
        sheet.text_right(REGULAR, 10.0, COL_PRICE, y, &money(&item.unit_price));
        sheet.text_right(REGULAR, 10.0, COL_TOTAL, y, &money(&item.line_total()));
        sheet.y = y - ROW_HEIGHT;
    }
    sheet.rule(sheet.y + ROW_HEIGHT - 6.0);
    sheet.y -= 10.0;
}

fn charges_box(sheet: &mut Sheet, order: &Order) {
    let c = &order.charges;
    let rows = [
        ("Items Subtotal", &c.items_total),
        ("Service Charge", &c.service_charge),
        ("GST", &c.gst),
        ("Platform Fee", &c.platform_fee),
        ("Delivery Charge", &c.delivery_charge),
        ("Tip", &c.tip),
    ];
    let height = (rows.len() as f32 + 1.0) * ROW_HEIGHT + 16.0;
    sheet.ensure_room(height);

    let left = PAGE_WIDTH - MARGIN - 230.0;
    let top = sheet.y + 12.0;
    sheet.rect(left, top - height, 230.0, height, (0.96, 0.96, 0.96));

    let mut y = sheet.y - 4.0;
    for (label, value) in rows {
        sheet.text(REGULAR, 10.0, left + 10.0, y, label);
        sheet.text_right(REGULAR, 10.0, COL_TOTAL, y, &money(value));
        y -= ROW_HEIGHT;
    }
    sheet.rect(left, y - 6.0, 230.0, ROW_HEIGHT + 4.0, GREEN);
    let white = (1.0, 1.0, 1.0);
    sheet.colored_text(white, BOLD, 11.0, left + 10.0, y, "Grand Total");
    sheet.ops().push(Operation::new("q", vec![]));
    sheet.fill(white);
    sheet.text_right(BOLD, 11.0, COL_TOTAL, y, &money(&c.grand_total));
    sheet.ops().push(Operation::new("Q", vec![]));
    sheet.y = top - height - 20.0;
}

fn footer(sheet: &mut Sheet, page: usize, pages: usize) {
    sheet.rule(70.0);
    let grey = (0.4, 0.4, 0.4);
    sheet.colored_text(
        grey,
        REGULAR,
        9.0,
        MARGIN,
        55.0,
        "This is a system generated invoice. No signature required.",
    );
    sheet.colored_text(GREEN, BOLD, 10.0, MARGIN, 40.0, "Thank you for shopping with us!");
    if pages > 1 {
        let label = format!("Page {page} of {pages}");
        sheet.text_right(REGULAR, 9.0, PAGE_WIDTH - MARGIN, 40.0, &label);
    }
}

fn render_error(e: impl std::fmt::Display) -> DomainError {
    DomainError::Internal(format!("invoice rendering failed: {e}"))
}

fn assemble(pages: Vec<Vec<Operation>>) -> Result<Vec<u8>, DomainError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR => regular_id,
            BOLD => bold_id,
        },
    });

    let mut kids = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations }.encode().map_err(render_error)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(render_error)?;
    Ok(bytes)
}

/// Renders the invoice for a delivered order.
pub fn render_invoice(order: &Order) -> Result<Vec<u8>, DomainError> {
    if order.status != OrderStatus::Delivered {
        return Err(DomainError::InvoiceNotReady);
    }
    let mut sheet = Sheet::new();
    header(&mut sheet, order);
    bill_to(&mut sheet, order);
    items_table(&mut sheet, order);
    charges_box(&mut sheet, order);

    let total = sheet.pages.len();
    for page in 0..total {
        sheet.current = page;
        footer(&mut sheet, page + 1, total);
    }
    assemble(sheet.pages)
}
