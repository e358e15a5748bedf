//! Common domain type definitions
//!
//! Closed value sets shared by the document models, the local validator and
//! the remote `$jsonSchema` rules. Each enum exposes its canonical labels as
//! `NAMES`, which is what the schema definitions consume.

use std::fmt;
use std::str::FromStr;

use crate::error::LoaderError;

macro_rules! clinical_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Canonical stored labels, in declaration order
            pub const NAMES: &'static [&'static str] = &[$($label),+];

            /// The canonical stored label
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl FromStr for $name {
            type Err = LoaderError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    other => Err(LoaderError::Schema(format!(
                        "'{other}' is not a valid {} value",
                        stringify!($name)
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

clinical_enum! {
    /// Gender of a patient
    Gender {
        Male => "Male",
        Female => "Female",
    }
}

clinical_enum! {
    /// ABO/Rh blood group
    BloodType {
        APositive => "A+",
        ANegative => "A-",
        BPositive => "B+",
        BNegative => "B-",
        OPositive => "O+",
        ONegative => "O-",
        AbPositive => "AB+",
        AbNegative => "AB-",
    }
}

clinical_enum! {
    /// Primary medical condition recorded for a patient
    MedicalCondition {
        Cancer => "Cancer",
        Obesity => "Obesity",
        Diabetes => "Diabetes",
        Asthma => "Asthma",
        Hypertension => "Hypertension",
        Arthritis => "Arthritis",
    }
}

clinical_enum! {
    /// How the patient was admitted
    AdmissionType {
        Urgent => "Urgent",
        Emergency => "Emergency",
        Elective => "Elective",
    }
}

clinical_enum! {
    /// Outcome of the tests attached to a medical record
    TestResult {
        Normal => "Normal",
        Abnormal => "Abnormal",
        Inconclusive => "Inconclusive",
    }
}
