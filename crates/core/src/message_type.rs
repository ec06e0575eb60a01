// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of command message types
//!
//! A command entry's first byte is its message type. The high bit marks
//! commands that older servers may skip when they do not recognize them.

use std::borrow::Cow;
use std::fmt;

/// High bit of the message-type byte: skip the command if unrecognized
pub const IGNORE_UNKNOWN_TYPE_FLAG: u8 = 0x80;

macro_rules! message_types {
    ($($variant:ident = $tag:literal => $name:literal,)*) => {
        /// Known command message types
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum MessageType {
            $($variant,)*
        }

        impl MessageType {
            /// Every registered message type, in tag order
            pub const ALL: &'static [MessageType] = &[$(MessageType::$variant,)*];

            /// Look up a message type by its tag (flag bit already cleared)
            pub fn from_tag(tag: u8) -> Option<Self> {
                match tag {
                    $($tag => Some(MessageType::$variant),)*
                    _ => None,
                }
            }

            /// Numeric tag written into the log
            pub fn tag(self) -> u8 {
                match self {
                    $(MessageType::$variant => $tag,)*
                }
            }

            /// Registry name of the message type
            pub fn name(self) -> &'static str {
                match self {
                    $(MessageType::$variant => $name,)*
                }
            }
        }
    };
}

message_types! {
    NodeRegister = 0 => "NodeRegisterRequestType",
    NodeDeregister = 1 => "NodeDeregisterRequestType",
    NodeUpdateStatus = 2 => "NodeUpdateStatusRequestType",
    NodeUpdateDrain = 3 => "NodeUpdateDrainRequestType",
    JobRegister = 4 => "JobRegisterRequestType",
    JobDeregister = 5 => "JobDeregisterRequestType",
    EvalUpdate = 6 => "EvalUpdateRequestType",
    EvalDelete = 7 => "EvalDeleteRequestType",
    AllocUpdate = 8 => "AllocUpdateRequestType",
    AllocClientUpdate = 9 => "AllocClientUpdateRequestType",
    ReconcileJobSummaries = 10 => "ReconcileJobSummariesRequestType",
    VaultAccessorRegister = 11 => "VaultAccessorRegisterRequestType",
    VaultAccessorDeregister = 12 => "VaultAccessorDeregisterRequestType",
    ApplyPlanResults = 13 => "ApplyPlanResultsRequestType",
    DeploymentStatusUpdate = 14 => "DeploymentStatusUpdateRequestType",
    DeploymentPromote = 15 => "DeploymentPromoteRequestType",
    DeploymentAllocHealth = 16 => "DeploymentAllocHealthRequestType",
    DeploymentDelete = 17 => "DeploymentDeleteRequestType",
    JobStability = 18 => "JobStabilityRequestType",
    AclPolicyUpsert = 19 => "ACLPolicyUpsertRequestType",
    AclPolicyDelete = 20 => "ACLPolicyDeleteRequestType",
    AclTokenUpsert = 21 => "ACLTokenUpsertRequestType",
    AclTokenDelete = 22 => "ACLTokenDeleteRequestType",
    AclTokenBootstrap = 23 => "ACLTokenBootstrapRequestType",
    Autopilot = 24 => "AutopilotRequestType",
    UpsertNodeEvents = 25 => "UpsertNodeEventsType",
    JobBatchDeregister = 26 => "JobBatchDeregisterRequestType",
    AllocUpdateDesiredTransition = 27 => "AllocUpdateDesiredTransitionRequestType",
    NodeUpdateEligibility = 28 => "NodeUpdateEligibilityRequestType",
    BatchNodeUpdateDrain = 29 => "BatchNodeUpdateDrainRequestType",
    SchedulerConfig = 30 => "SchedulerConfigRequestType",
    NodeBatchDeregister = 31 => "NodeBatchDeregisterRequestType",
    ClusterMetadata = 32 => "ClusterMetadataRequestType",
    ServiceIdentityAccessorRegister = 33 => "ServiceIdentityAccessorRegisterRequestType",
    ServiceIdentityAccessorDeregister = 34 => "ServiceIdentityAccessorDeregisterRequestType",
    CsiVolumeRegister = 35 => "CSIVolumeRegisterRequestType",
    CsiVolumeDeregister = 36 => "CSIVolumeDeregisterRequestType",
    CsiVolumeClaim = 37 => "CSIVolumeClaimRequestType",
    ScalingEventRegister = 38 => "ScalingEventRegisterRequestType",
    CsiVolumeClaimBatch = 39 => "CSIVolumeClaimBatchRequestType",
    CsiPluginDelete = 40 => "CSIPluginDeleteRequestType",
    EventSinkUpsert = 41 => "EventSinkUpsertRequestType",
    EventSinkDelete = 42 => "EventSinkDeleteRequestType",
    BatchEventSinkUpdateProgress = 43 => "BatchEventSinkUpdateProgressType",
    OneTimeTokenUpsert = 44 => "OneTimeTokenUpsertRequestType",
    OneTimeTokenDelete = 45 => "OneTimeTokenDeleteRequestType",
    OneTimeTokenExpire = 46 => "OneTimeTokenExpireRequestType",
    ServiceRegistrationUpsert = 47 => "ServiceRegistrationUpsertRequestType",
    ServiceRegistrationDeleteById = 48 => "ServiceRegistrationDeleteByIDRequestType",
    ServiceRegistrationDeleteByNodeId = 49 => "ServiceRegistrationDeleteByNodeIDRequestType",
    VarApplyState = 50 => "VarApplyStateRequestType",
    RootKeyMetaUpsert = 51 => "RootKeyMetaUpsertRequestType",
    RootKeyMetaDelete = 52 => "RootKeyMetaDeleteRequestType",
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name for a raw tag, falling back to its decimal form
pub fn tag_name(tag: u8) -> Cow<'static, str> {
    match MessageType::from_tag(tag) {
        Some(mt) => Cow::Borrowed(mt.name()),
        None => Cow::Owned(tag.to_string()),
    }
}

#[cfg(test)]
#[path = "message_type_tests.rs"]
mod tests;
