use clap::{Parser, Subcommand};
use praxis_core::{
    dataset_path_from_env_value, parse_optional_status, practice_name_from_env_value,
    CopaymentInvoice, CoreConfig, EffectiveCopaymentStatus, PracticeService, PrescriptionNumber,
    RefundLetter, SettlementView,
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "praxis")]
#[command(about = "Praxis prescription administration CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all prescriptions with their current statuses
    List,
    /// Show one prescription in detail
    Show {
        /// Prescription number
        number: String,
    },
    /// Change the prescription status (applies cross-field rules)
    SetStatus {
        /// Prescription number
        number: String,
        /// New status: active, aborted, treatment_complete, billed, expired
        status: String,
    },
    /// Change the insurance billing status
    SetInsuranceStatus {
        /// Prescription number
        number: String,
        /// New status (ready_to_send, for_fixing, sent, paid); omit to clear
        status: Option<String>,
    },
    /// Change the copayment billing status
    SetCopaymentStatus {
        /// Prescription number
        number: String,
        /// New status (paid, for_refund); omit to clear
        status: Option<String>,
    },
    /// Abort the treatment course
    Abort {
        /// Prescription number
        number: String,
        /// Also update the follow-up queue entry
        #[arg(long)]
        update_followup: bool,
    },
    /// Generate (or show) the copayment invoice
    Invoice {
        /// Prescription number
        number: String,
    },
    /// Generate the refund correction letter
    Refund {
        /// Prescription number
        number: String,
    },
    /// Show the authoritative settlement view
    Settlement {
        /// Prescription number
        number: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let cfg = Arc::new(CoreConfig::new(
        dataset_path_from_env_value(std::env::var("PRAXIS_DATA_FILE").ok()),
        practice_name_from_env_value(std::env::var("PRAXIS_PRACTICE_NAME").ok()),
    )?);
    let service = PracticeService::new(cfg)?;

    match cli.command {
        Some(Commands::List) | None => {
            let rows = service.overview()?;
            if rows.is_empty() {
                println!("No prescriptions found.");
            } else {
                for row in rows {
                    let copayment = match row.copayment_billing {
                        EffectiveCopaymentStatus::NotApplicable => "n/a".to_string(),
                        EffectiveCopaymentStatus::Unset => "-".to_string(),
                        EffectiveCopaymentStatus::Status(status) => status.to_string(),
                    };
                    println!(
                        "{}  {} ({})  {}/{} treatments  status: {}  insurance: {}  copayment: {}",
                        row.number,
                        row.patient_name,
                        row.treatment_label,
                        row.completed_treatments,
                        row.prescribed_treatments,
                        row.status,
                        row.insurance_billing_status
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "-".into()),
                        copayment,
                    );
                }
            }
        }
        Some(Commands::Show { number }) => {
            let number = PrescriptionNumber::new(&number)?;
            let rows = service.overview()?;
            match rows.into_iter().find(|row| row.number == number) {
                Some(row) => {
                    println!("Prescription {}", row.number);
                    println!("Patient: {}", row.patient_name);
                    println!("Treatment: {}", row.treatment_label);
                    println!(
                        "Progress: {}/{} treatments at {:.2} each",
                        row.completed_treatments,
                        row.prescribed_treatments,
                        row.amount_per_treatment
                    );
                    println!("Status: {}", row.status);
                    println!(
                        "Insurance billing: {}",
                        row.insurance_billing_status
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "-".into())
                    );
                    println!(
                        "Copayment billing: {}",
                        match row.copayment_billing {
                            EffectiveCopaymentStatus::NotApplicable => "not applicable".to_string(),
                            EffectiveCopaymentStatus::Unset => "-".to_string(),
                            EffectiveCopaymentStatus::Status(status) => status.to_string(),
                        }
                    );
                    println!("Refund available: {}", if row.refund_available { "yes" } else { "no" });
                }
                None => eprintln!("Unknown prescription: {number}"),
            }
        }
        Some(Commands::SetStatus { number, status }) => {
            let number = PrescriptionNumber::new(&number)?;
            match service.change_prescription_status(&number, status.parse()?) {
                Ok(plan) => {
                    println!("Set {number} to {}", plan.primary);
                    for change in &plan.derived {
                        println!("Also applied: {change:?}");
                    }
                }
                Err(e) => eprintln!("Error changing status: {e}"),
            }
        }
        Some(Commands::SetInsuranceStatus { number, status }) => {
            let number = PrescriptionNumber::new(&number)?;
            let status = parse_optional_status(status.as_deref().unwrap_or(""))?;
            match service.change_insurance_billing_status(&number, status) {
                Ok(()) => println!("Updated insurance billing status for {number}"),
                Err(e) => eprintln!("Error changing insurance billing status: {e}"),
            }
        }
        Some(Commands::SetCopaymentStatus { number, status }) => {
            let number = PrescriptionNumber::new(&number)?;
            let status = parse_optional_status(status.as_deref().unwrap_or(""))?;
            match service.change_copayment_billing_status(&number, status) {
                Ok(()) => println!("Updated copayment billing status for {number}"),
                Err(e) => eprintln!("Error changing copayment billing status: {e}"),
            }
        }
        Some(Commands::Abort {
            number,
            update_followup,
        }) => {
            let number = PrescriptionNumber::new(&number)?;
            match service.mark_as_aborted(&number, update_followup) {
                Ok(plan) => {
                    println!("Aborted {number}");
                    for change in &plan.derived {
                        println!("Also applied: {change:?}");
                    }
                }
                Err(e) => eprintln!("Error aborting: {e}"),
            }
        }
        Some(Commands::Invoice { number }) => {
            let number = PrescriptionNumber::new(&number)?;
            match service.generate_invoice(&number) {
                Ok(invoice) => print_invoice(&invoice),
                Err(e) => eprintln!("Error generating invoice: {e}"),
            }
        }
        Some(Commands::Refund { number }) => {
            let number = PrescriptionNumber::new(&number)?;
            match service.generate_refund(&number) {
                Ok(letter) => print_refund(&letter),
                Err(e) => eprintln!("Error generating refund: {e}"),
            }
        }
        Some(Commands::Settlement { number }) => {
            let number = PrescriptionNumber::new(&number)?;
            match service.settlement_view(&number) {
                Ok(SettlementView::Invoice(invoice)) => print_invoice(&invoice),
                Ok(SettlementView::Refund(letter)) => print_refund(&letter),
                Err(e) => eprintln!("Error reading settlement view: {e}"),
            }
        }
    }

    Ok(())
}

fn print_invoice(invoice: &CopaymentInvoice) {
    println!("{}", invoice.practice_name);
    println!(
        "Copayment invoice {} ({})",
        invoice.invoice_number, invoice.issued_on
    );
    println!(
        "Patient: {}  Prescription: {}",
        invoice.patient_name, invoice.prescription_number
    );
    println!(
        "{} x {} ({}): {:.2}",
        invoice.treatments_billed,
        invoice.treatment_label,
        invoice.amount_per_treatment,
        invoice.treatment_cost
    );
    println!("Base fee: {:.2}", invoice.base_fee);
    println!("Cost share (10%): {:.2}", invoice.cost_share);
    println!("Copayment total: {:.2}", invoice.copayment_total);
}

fn print_refund(letter: &RefundLetter) {
    println!("{}", letter.practice_name);
    println!(
        "Refund correction {} for invoice {} ({})",
        letter.refund_invoice_number, letter.original_invoice_number, letter.issued_on
    );
    println!(
        "Patient: {}  Prescription: {}",
        letter.patient_name, letter.prescription_number
    );
    println!(
        "Treatments carried out: {} of {}",
        letter.completed_treatments, letter.prescribed_treatments
    );
    println!("Original copayment: {:.2}", letter.original_copayment);
    println!("Actual copayment: {:.2}", letter.actual_copayment);
    println!("Refund amount: {:.2}", letter.refund_amount);
}
